//! Sink configuration.
//!
//! Configuration for a log sink, including:
//! - Queue capacity (back-pressure threshold)
//! - What happens to queued records on shutdown
//! - Which clock zone rendered timestamps use

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SinkError};
use crate::types::TimestampZone;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 50;

/// Upper bound accepted for the queue capacity.
pub const MAX_CAPACITY: usize = 65_536;

/// What the worker does with records still queued when shutdown is observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Stop at once; queued records are discarded.
    #[default]
    Prompt,
    /// Render every queued record, then stop.
    Drain,
}

/// Log sink configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Maximum number of records waiting in the queue.
    pub capacity: usize,
    /// Handling of queued records on shutdown.
    pub shutdown_policy: ShutdownPolicy,
    /// Clock zone for rendered timestamps.
    pub timestamp_zone: TimestampZone,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            shutdown_policy: ShutdownPolicy::Prompt,
            timestamp_zone: TimestampZone::Local,
        }
    }
}

impl SinkConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the shutdown policy.
    #[must_use]
    pub const fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Sets the timestamp zone.
    #[must_use]
    pub const fn with_timestamp_zone(mut self, zone: TimestampZone) -> Self {
        self.timestamp_zone = zone;
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SinkError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SinkError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity is zero or above [`MAX_CAPACITY`].
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(SinkError::Config(
                "capacity must be greater than 0".to_string(),
            ));
        }

        if self.capacity > MAX_CAPACITY {
            return Err(SinkError::Config(format!(
                "capacity cannot exceed {MAX_CAPACITY}"
            )));
        }

        Ok(())
    }
}
