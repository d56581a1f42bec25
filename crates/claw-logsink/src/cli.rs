//! Command-line interface for the demo binary.
//!
//! The binary starts a sink on stdout, lets one or more producer tasks
//! enqueue a list of records, pauses, then requests shutdown.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use crate::config::{ShutdownPolicy, SinkConfig};
use crate::sink::{LogSink, SinkReport};
use crate::types::{LogRecord, Severity, TimestampZone};

/// Messages replayed when none are given on the command line.
pub const DEFAULT_MESSAGES: [(Severity, &str); 2] = [
    (Severity::Info, "App is starting"),
    (Severity::Info, "App is shutting down"),
];

/// Run a log sink, feed it records, then shut it down.
#[derive(Parser, Debug, Clone)]
#[command(name = "claw-logsink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML file with sink configuration.
    #[arg(short, long, env = "CLAW_LOGSINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Queue capacity (overrides the config file).
    #[arg(long)]
    pub capacity: Option<usize>,

    /// What to do with queued records on shutdown (overrides the config file).
    #[arg(short, long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Render timestamps in UTC instead of local time.
    #[arg(long)]
    pub utc: bool,

    /// Record to enqueue, as SEVERITY:TEXT. Repeatable.
    #[arg(short, long = "message", value_name = "SEVERITY:TEXT", value_parser = parse_message)]
    pub messages: Vec<MessageArg>,

    /// Number of concurrent producers replaying the messages.
    #[arg(long, default_value_t = 1)]
    pub producers: usize,

    /// Pause before requesting shutdown, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub settle_ms: u64,
}

/// Shutdown policy options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Stop at once, discarding queued records.
    Prompt,
    /// Render queued records before stopping.
    Drain,
}

impl From<PolicyArg> for ShutdownPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Prompt => Self::Prompt,
            PolicyArg::Drain => Self::Drain,
        }
    }
}

/// A record given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Record severity.
    pub severity: Severity,
    /// Record text.
    pub text: String,
}

/// Parses `SEVERITY:TEXT`.
///
/// # Errors
///
/// Returns a message for clap if the separator is missing or the severity
/// is unknown.
pub fn parse_message(s: &str) -> Result<MessageArg, String> {
    let (severity, text) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SEVERITY:TEXT, got '{s}'"))?;
    let severity = severity.parse::<Severity>().map_err(|e| e.to_string())?;
    Ok(MessageArg {
        severity,
        text: text.to_string(),
    })
}

impl Cli {
    /// Builds the sink configuration from the config file and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn sink_config(&self) -> crate::Result<SinkConfig> {
        let mut config = match &self.config {
            Some(path) => SinkConfig::from_file(path)?,
            None => SinkConfig::default(),
        };

        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(policy) = self.policy {
            config.shutdown_policy = policy.into();
        }
        if self.utc {
            config.timestamp_zone = TimestampZone::Utc;
        }

        config.validate()?;
        Ok(config)
    }

    /// Returns the messages to replay, falling back to [`DEFAULT_MESSAGES`].
    #[must_use]
    pub fn messages(&self) -> Vec<MessageArg> {
        if self.messages.is_empty() {
            DEFAULT_MESSAGES
                .iter()
                .map(|(severity, text)| MessageArg {
                    severity: *severity,
                    text: (*text).to_string(),
                })
                .collect()
        } else {
            self.messages.clone()
        }
    }
}

/// Runs the demo against `writer` and returns the worker's report.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a producer fails, or
/// the worker task panics.
pub async fn run<W: Write + Send + 'static>(cli: &Cli, writer: W) -> anyhow::Result<SinkReport> {
    let config = cli.sink_config().context("invalid sink configuration")?;
    let running = LogSink::new(config, writer)?.spawn();
    let messages = cli.messages();
    let producers = cli.producers.max(1);

    debug!(producers, records = messages.len(), "starting producers");

    let mut tasks = Vec::with_capacity(producers);
    for producer in 0..producers {
        let handle = running.handle();
        let messages = messages.clone();
        tasks.push(tokio::spawn(async move {
            for message in messages {
                let text = if producers > 1 {
                    format!("producer {producer}: {}", message.text)
                } else {
                    message.text
                };
                handle.enqueue(LogRecord::new(message.severity, text)).await?;
            }
            crate::Result::Ok(())
        }));
    }

    for task in tasks {
        task.await.context("producer task failed")??;
    }

    tokio::time::sleep(Duration::from_millis(cli.settle_ms)).await;

    let report = running.shutdown().await.context("log sink worker failed")?;
    info!(
        rendered = report.stats.rendered,
        failed = report.stats.failed,
        discarded = report.stats.discarded,
        "demo finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::StopReason;
    use crate::writer::SharedBuffer;
    use tempfile::NamedTempFile;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["claw-logsink"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.producers, 1);
        assert_eq!(cli.settle_ms, 100);
        assert!(!cli.utc);
        let config = cli.sink_config().expect("valid");
        assert_eq!(config, SinkConfig::default());
        assert_eq!(config.timestamp_zone, TimestampZone::Local);
        assert_eq!(cli.messages().len(), 2);
    }

    #[test]
    fn cli_parses_messages() {
        let cli = Cli::parse_from([
            "claw-logsink",
            "-m",
            "warning:disk at 90%",
            "--message",
            "ERROR:disk full: writes failing",
        ]);
        let messages = cli.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].severity, Severity::Warning);
        assert_eq!(messages[0].text, "disk at 90%");
        assert_eq!(messages[1].severity, Severity::Error);
        assert_eq!(messages[1].text, "disk full: writes failing");
    }

    #[test]
    fn cli_rejects_bad_message() {
        let result = Cli::try_parse_from(["claw-logsink", "-m", "no separator"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["claw-logsink", "-m", "FATAL:boom"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"capacity = 10\nshutdown_policy = \"prompt\"\n")
            .expect("write");
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from([
            "claw-logsink",
            "--config",
            &path,
            "--capacity",
            "4",
            "--policy",
            "drain",
            "--utc",
        ]);
        let config = cli.sink_config().expect("valid");
        assert_eq!(config.capacity, 4);
        assert_eq!(config.shutdown_policy, ShutdownPolicy::Drain);
        assert_eq!(config.timestamp_zone, TimestampZone::Utc);
    }

    #[test]
    fn zero_capacity_flag_is_rejected() {
        let cli = Cli::parse_from(["claw-logsink", "--capacity", "0"]);
        assert!(cli.sink_config().is_err());
    }

    #[tokio::test]
    async fn run_replays_default_messages() {
        let cli = Cli::parse_from(["claw-logsink", "--settle-ms", "20"]);
        let buffer = SharedBuffer::new();

        let report = run(&cli, buffer.clone()).await.expect("demo runs");
        assert_eq!(report.reason, StopReason::Shutdown);
        assert_eq!(report.stats.rendered, 2);

        let lines = buffer.lines();
        assert!(lines[0].ends_with(" - [INFO]App is starting"));
        assert!(lines[1].ends_with(" - [INFO]App is shutting down"));
    }

    #[tokio::test]
    async fn run_with_many_producers_prefixes_messages() {
        let cli = Cli::parse_from([
            "claw-logsink",
            "--producers",
            "3",
            "--policy",
            "drain",
            "--settle-ms",
            "0",
        ]);
        let buffer = SharedBuffer::new();

        let report = run(&cli, buffer.clone()).await.expect("demo runs");
        assert_eq!(report.stats.rendered, 6);
        assert!(buffer.contents().contains("producer 2: App is starting"));
    }

    #[tokio::test]
    async fn run_fails_on_invalid_config() {
        let cli = Cli::parse_from(["claw-logsink", "--capacity", "0"]);
        let result = run(&cli, SharedBuffer::new()).await;
        assert!(result.is_err());
    }
}
