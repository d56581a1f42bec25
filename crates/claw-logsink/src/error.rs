//! Error types for the log sink.

use thiserror::Error;

use crate::types::LogRecord;

/// Errors that can occur when talking to a log sink.
///
/// Back-pressure is not represented here: a full queue makes
/// [`SinkHandle::enqueue`](crate::SinkHandle::enqueue) wait instead of failing.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink has been told to shut down, or its worker is gone.
    #[error("log sink is closed")]
    Closed,

    /// The queue was full and the caller asked not to wait.
    ///
    /// The record is handed back so the caller can retry or drop it.
    #[error("log queue is full")]
    QueueFull(LogRecord),

    /// A bounded enqueue did not get a slot in time.
    #[error("timed out waiting for queue capacity")]
    Timeout,

    /// A severity name that is not INFO, WARNING or ERROR.
    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    /// Invalid sink configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker task panicked or was cancelled.
    #[error("log sink worker failed: {0}")]
    Worker(String),
}

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
