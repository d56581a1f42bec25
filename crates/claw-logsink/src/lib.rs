//! # claw-logsink
//!
//! Asynchronous log sink with a bounded queue and cooperative shutdown.
//!
//! This crate provides:
//!
//! - [`LogRecord`] — Immutable record with timestamp, severity and message
//! - [`Severity`] — INFO, WARNING, ERROR
//! - [`LogSink`] — Builds the queue, the shutdown signal and the worker
//! - [`SinkHandle`] — Cloneable producer handle (enqueue, shutdown)
//! - [`SinkWorker`] — The render loop
//! - [`SinkConfig`] — Capacity, shutdown policy, timestamp zone
//! - [`SharedBuffer`] — In-memory writer for capturing output
//!
//! ## Example
//!
//! ```rust,no_run
//! use claw_logsink::{LogRecord, LogSink, SinkConfig};
//!
//! # async fn demo() -> claw_logsink::Result<()> {
//! let running = LogSink::new(SinkConfig::default(), std::io::stdout())?.spawn();
//! let handle = running.handle();
//!
//! handle.enqueue(LogRecord::info("App is starting")).await?;
//! handle.enqueue(LogRecord::info("App is shutting down")).await?;
//!
//! let report = running.shutdown().await?;
//! println!("rendered {}", report.stats.rendered);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod sink;
pub mod types;
pub mod writer;

// Re-export main types
pub use config::{ShutdownPolicy, SinkConfig, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use error::{Result, SinkError};
pub use sink::{
    LogSink, RunningSink, SinkHandle, SinkReport, SinkState, SinkStats, SinkWorker, StopReason,
};
pub use types::{LogRecord, Severity, TimestampZone, TIMESTAMP_FORMAT};
pub use writer::SharedBuffer;
