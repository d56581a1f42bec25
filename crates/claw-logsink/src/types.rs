//! Core types for the log sink.
//!
//! This module provides:
//! - [`Severity`] — The closed set of record severities
//! - [`LogRecord`] — An immutable record handed from a producer to the sink
//! - [`TimestampZone`] — Which clock the rendered timestamp is shown in

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Timestamp layout of a rendered line (`2006-01-02T15:04:05`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Record severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// General information
    Info,
    /// Something unexpected that did not stop the application
    #[serde(alias = "WARN")]
    Warning,
    /// Error conditions
    Error,
}

impl Severity {
    /// Returns the upper-case name used in rendered lines.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(SinkError::InvalidSeverity(s.to_string())),
        }
    }
}

/// Clock zone used when rendering record timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampZone {
    /// The host's local time zone
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

/// A single log record.
///
/// Records are immutable once built; ownership moves into the sink when
/// they are enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    severity: Severity,
    message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), severity, message)
    }

    /// Creates a record with an explicit timestamp.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            severity,
            message: message.into(),
        }
    }

    /// Shorthand for an [`Severity::Info`] record stamped now.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Shorthand for a [`Severity::Warning`] record stamped now.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Shorthand for an [`Severity::Error`] record stamped now.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// When the record was produced.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The record's severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// The free-form message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the record as `YYYY-MM-DDTHH:MM:SS - [SEVERITY]message`.
    ///
    /// The line carries no trailing newline. Line breaks inside the message
    /// are escaped as `\n` / `\r` so one record is always one line.
    #[must_use]
    pub fn render(&self, zone: TimestampZone) -> String {
        let ts = match zone {
            TimestampZone::Utc => self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            TimestampZone::Local => self
                .timestamp
                .with_timezone(&Local)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        };
        let message = self.message.replace('\r', "\\r").replace('\n', "\\n");
        format!("{ts} - [{}]{message}", self.severity)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(TimestampZone::Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use test_case::test_case;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5)
            .single()
            .unwrap_or_else(Utc::now)
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn severity_display_is_upper_case() {
        assert_eq!(Severity::Info.to_string(), "INFO");
        assert_eq!(Severity::Warning.to_string(), "WARNING");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }

    #[test_case("INFO", Severity::Info ; "upper info")]
    #[test_case("info", Severity::Info ; "lower info")]
    #[test_case("Warning", Severity::Warning ; "mixed warning")]
    #[test_case("warn", Severity::Warning ; "warn alias")]
    #[test_case(" ERROR ", Severity::Error ; "padded error")]
    fn severity_parses(input: &str, expected: Severity) {
        let parsed: Severity = input.parse().expect("should parse");
        assert_eq!(parsed, expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("FATAL" ; "unknown")]
    #[test_case("DEBUG" ; "not in the set")]
    fn severity_rejects_unknown(input: &str) {
        let result = input.parse::<Severity>();
        assert!(matches!(result, Err(SinkError::InvalidSeverity(_))));
    }

    #[test]
    fn severity_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Severity::Warning).expect("serialize");
        assert_eq!(json, "\"WARNING\"");

        let parsed: Severity = serde_json::from_str("\"WARN\"").expect("deserialize alias");
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn render_matches_reference_layout() {
        let record = LogRecord::at(fixed_time(), Severity::Info, "App is starting");
        assert_eq!(
            record.render(TimestampZone::Utc),
            "2006-01-02T15:04:05 - [INFO]App is starting"
        );
    }

    #[test]
    fn render_has_no_space_between_severity_and_message() {
        let record = LogRecord::at(fixed_time(), Severity::Error, "boom");
        assert!(record.render(TimestampZone::Utc).ends_with("[ERROR]boom"));
    }

    #[test]
    fn render_local_keeps_layout() {
        let record = LogRecord::at(fixed_time(), Severity::Warning, "x");
        let line = record.render(TimestampZone::Local);
        // Offset varies by host; only the shape is stable.
        assert_eq!(line.len(), "2006-01-02T15:04:05 - [WARNING]x".len());
        assert!(line.contains(" - [WARNING]x"));
    }

    #[test]
    fn default_zone_is_local() {
        assert_eq!(TimestampZone::default(), TimestampZone::Local);

        let record = LogRecord::at(fixed_time(), Severity::Info, "App is starting");
        let expected = format!(
            "{} - [INFO]App is starting",
            record.timestamp().with_timezone(&Local).format(TIMESTAMP_FORMAT)
        );
        assert_eq!(record.render(TimestampZone::default()), expected);
    }

    #[test]
    fn render_escapes_line_breaks() {
        let record = LogRecord::at(fixed_time(), Severity::Error, "first\nsecond\r\nthird");
        let line = record.render(TimestampZone::Utc);
        assert_eq!(line, "2006-01-02T15:04:05 - [ERROR]first\\nsecond\\r\\nthird");
        assert_eq!(line.lines().count(), 1);
        // The record itself keeps the original text.
        assert_eq!(record.message(), "first\nsecond\r\nthird");
    }

    #[test]
    fn display_renders_utc() {
        let record = LogRecord::at(fixed_time(), Severity::Warning, "low memory");
        assert_eq!(record.to_string(), "2006-01-02T15:04:05 - [WARNING]low memory");
    }

    #[test]
    fn shorthands_set_severity() {
        assert_eq!(LogRecord::info("a").severity(), Severity::Info);
        assert_eq!(LogRecord::warning("b").severity(), Severity::Warning);
        assert_eq!(LogRecord::error("c").severity(), Severity::Error);
        assert_eq!(LogRecord::error("c").message(), "c");
    }

    #[test]
    fn new_stamps_current_time() {
        let before = Utc::now();
        let record = LogRecord::info("now");
        let after = Utc::now();
        assert!(record.timestamp() >= before && record.timestamp() <= after);
    }

    proptest! {
        #[test]
        fn render_always_ends_with_message(message in "[^\\r\\n]{0,64}", secs in 0i64..4_000_000_000) {
            let ts = Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now);
            let record = LogRecord::at(ts, Severity::Info, message.clone());
            let line = record.render(TimestampZone::Utc);
            let expected_suffix = format!(" - [INFO]{message}");
            prop_assert!(line.ends_with(&expected_suffix));
            prop_assert_eq!(&line[..19], ts.format(TIMESTAMP_FORMAT).to_string());
        }
    }
}
