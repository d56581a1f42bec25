//! The asynchronous log sink.
//!
//! This module provides:
//! - [`LogSink`] — A sink built from a config and a writer, not yet running
//! - [`SinkHandle`] — Cloneable producer-side handle (enqueue, shutdown)
//! - [`SinkWorker`] — The consumer loop that renders records
//! - [`RunningSink`] — A sink whose worker has been spawned on tokio
//!
//! The worker waits on the record queue and the shutdown signal at once.
//! When both are ready the shutdown signal wins; what then happens to
//! records still queued is decided by [`ShutdownPolicy`].

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{ShutdownPolicy, SinkConfig};
use crate::error::{Result, SinkError};
use crate::types::{LogRecord, Severity};

/// Lifecycle state of a sink worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkState {
    /// Waiting for the next record or the shutdown signal.
    Running,
    /// Rendering one record.
    Draining,
    /// Terminal; no further records are rendered.
    Stopped,
}

impl SinkState {
    /// Returns the lowercase name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal was observed.
    Shutdown,
    /// Every producer handle was dropped and the queue ran empty.
    QueueClosed,
}

/// Point-in-time counters for a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records accepted into the queue.
    pub enqueued: u64,
    /// Records written to the output.
    pub rendered: u64,
    /// Records whose write or flush failed.
    pub failed: u64,
    /// Records left in the queue by a prompt shutdown.
    pub discarded: u64,
}

/// Summary returned by [`SinkWorker::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    /// Why the worker stopped.
    pub reason: StopReason,
    /// Counters at the moment the worker stopped.
    pub stats: SinkStats,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    rendered: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SinkStats {
        SinkStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// State shared between producer handles and the worker.
#[derive(Debug)]
struct Shared {
    capacity: usize,
    shutdown: watch::Sender<bool>,
    state: watch::Sender<SinkState>,
    counters: Counters,
}

/// A log sink that has been built but whose worker is not running yet.
pub struct LogSink<W> {
    handle: SinkHandle,
    worker: SinkWorker<W>,
}

impl<W> fmt::Debug for LogSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("handle", &self.handle)
            .field("config", &self.worker.config)
            .finish_non_exhaustive()
    }
}

impl<W: Write + Send + 'static> LogSink<W> {
    /// Creates the queue and shutdown signal and binds a worker to them.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Config`] if the configuration is invalid.
    pub fn new(config: SinkConfig, writer: W) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (state, _) = watch::channel(SinkState::Running);

        let shared = Arc::new(Shared {
            capacity: config.capacity,
            shutdown,
            state,
            counters: Counters::default(),
        });

        Ok(Self {
            handle: SinkHandle {
                tx,
                shared: Arc::clone(&shared),
            },
            worker: SinkWorker {
                config,
                rx,
                shutdown_rx,
                shared,
                writer,
            },
        })
    }

    /// Returns a producer handle.
    #[must_use]
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Splits the sink into its producer handle and its worker.
    #[must_use]
    pub fn into_parts(self) -> (SinkHandle, SinkWorker<W>) {
        (self.handle, self.worker)
    }

    /// Spawns the worker on the current tokio runtime.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> RunningSink {
        let join = tokio::spawn(self.worker.run());
        RunningSink {
            handle: self.handle,
            join,
        }
    }
}

/// Cloneable producer-side handle to a log sink.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<LogRecord>,
    shared: Arc<Shared>,
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkHandle")
            .field("capacity", &self.shared.capacity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SinkHandle {
    /// Enqueues a record, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Closed`] if shutdown was requested or the worker
    /// has gone away.
    pub async fn enqueue(&self, record: LogRecord) -> Result<()> {
        self.ensure_open()?;
        self.tx
            .send(record)
            .await
            .map_err(|_| SinkError::Closed)?;
        self.accepted();
        Ok(())
    }

    /// Enqueues a record from a thread outside the async runtime, blocking
    /// the thread while the queue is full.
    ///
    /// Panics if called from within an async execution context, like
    /// [`mpsc::Sender::blocking_send`].
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Closed`] if shutdown was requested or the worker
    /// has gone away.
    pub fn blocking_enqueue(&self, record: LogRecord) -> Result<()> {
        self.ensure_open()?;
        self.tx
            .blocking_send(record)
            .map_err(|_| SinkError::Closed)?;
        self.accepted();
        Ok(())
    }

    /// Enqueues a record without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::QueueFull`] with the record if the queue is at
    /// capacity, or [`SinkError::Closed`] if the sink is shut down.
    pub fn try_enqueue(&self, record: LogRecord) -> Result<()> {
        self.ensure_open()?;
        match self.tx.try_send(record) {
            Ok(()) => {
                self.accepted();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(record)) => Err(SinkError::QueueFull(record)),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkError::Closed),
        }
    }

    /// Enqueues a record, waiting at most `timeout` for queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Timeout`] if no slot freed up in time, or
    /// [`SinkError::Closed`] if the sink is shut down.
    pub async fn enqueue_timeout(&self, record: LogRecord, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        match self.tx.send_timeout(record, timeout).await {
            Ok(()) => {
                self.accepted();
                Ok(())
            }
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Err(SinkError::Timeout),
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(SinkError::Closed),
        }
    }

    /// Builds a record stamped now and enqueues it.
    ///
    /// # Errors
    ///
    /// See [`SinkHandle::enqueue`].
    pub async fn log(&self, severity: Severity, message: impl Into<String>) -> Result<()> {
        self.enqueue(LogRecord::new(severity, message)).await
    }

    /// Signals the worker to stop.
    ///
    /// Only the first call has an effect. Calling it before the worker has
    /// started makes the worker stop as soon as it runs.
    pub fn request_shutdown(&self) {
        let already = self.shared.shutdown.send_replace(true);
        if !already {
            debug!("log sink shutdown requested");
        }
    }

    /// Returns true once [`request_shutdown`](Self::request_shutdown) has been called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    /// Returns the worker's current state.
    #[must_use]
    pub fn state(&self) -> SinkState {
        *self.shared.state.borrow()
    }

    /// Waits until the worker reaches [`SinkState::Stopped`].
    pub async fn stopped(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `Shared`, which this handle keeps alive.
        let _ = rx.wait_for(SinkState::is_terminal).await;
    }

    /// Returns a snapshot of the sink's counters.
    #[must_use]
    pub fn stats(&self) -> SinkStats {
        self.shared.counters.snapshot()
    }

    /// Returns the queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns how many records are waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_shutdown_requested() {
            return Err(SinkError::Closed);
        }
        Ok(())
    }

    fn accepted(&self) {
        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

enum Event {
    Shutdown,
    Record(LogRecord),
    Closed,
}

/// The consumer side of a sink.
///
/// Renders each record to the writer as one line, in queue order.
pub struct SinkWorker<W> {
    config: SinkConfig,
    rx: mpsc::Receiver<LogRecord>,
    shutdown_rx: watch::Receiver<bool>,
    shared: Arc<Shared>,
    writer: W,
}

impl<W: Write + Send + 'static> SinkWorker<W> {
    /// Runs the worker loop until shutdown is observed or every producer
    /// handle has been dropped.
    pub async fn run(mut self) -> SinkReport {
        info!(
            capacity = self.config.capacity,
            policy = ?self.config.shutdown_policy,
            "log sink started"
        );

        let reason = loop {
            let event = tokio::select! {
                biased;
                () = shutdown_signalled(&mut self.shutdown_rx) => Event::Shutdown,
                record = self.rx.recv() => record.map_or(Event::Closed, Event::Record),
            };

            match event {
                Event::Record(record) => self.render(&record),
                Event::Shutdown => {
                    self.finish_queue();
                    break StopReason::Shutdown;
                }
                Event::Closed => break StopReason::QueueClosed,
            }
        };

        if let Err(e) = self.writer.flush() {
            warn!(error = %e, "failed to flush log output");
        }
        self.shared.state.send_replace(SinkState::Stopped);

        let stats = self.shared.counters.snapshot();
        info!(
            reason = ?reason,
            rendered = stats.rendered,
            failed = stats.failed,
            discarded = stats.discarded,
            "log sink stopped"
        );

        SinkReport { reason, stats }
    }

    /// Closes the queue and applies the shutdown policy to what is left.
    fn finish_queue(&mut self) {
        self.rx.close();
        match self.config.shutdown_policy {
            ShutdownPolicy::Drain => {
                while let Ok(record) = self.rx.try_recv() {
                    self.render(&record);
                }
            }
            ShutdownPolicy::Prompt => {
                let mut dropped = 0_u64;
                while self.rx.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    self.shared
                        .counters
                        .discarded
                        .fetch_add(dropped, Ordering::Relaxed);
                    debug!(dropped, "discarded queued log records on shutdown");
                }
            }
        }
    }

    fn render(&mut self, record: &LogRecord) {
        self.shared.state.send_replace(SinkState::Draining);

        let line = format!("{}\n", record.render(self.config.timestamp_zone));
        let result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush());

        match result {
            Ok(()) => {
                self.shared.counters.rendered.fetch_add(1, Ordering::Relaxed);
                trace!(severity = %record.severity(), "rendered log record");
            }
            Err(e) => {
                self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    severity = %record.severity(),
                    "failed to render log record"
                );
            }
        }

        self.shared.state.send_replace(SinkState::Running);
    }
}

async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    // The sender lives in `Shared`, which the worker keeps alive.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// A sink whose worker runs on the tokio runtime.
#[derive(Debug)]
pub struct RunningSink {
    handle: SinkHandle,
    join: JoinHandle<SinkReport>,
}

impl RunningSink {
    /// Returns a producer handle.
    #[must_use]
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Requests shutdown and waits for the worker to stop.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Worker`] if the worker task panicked.
    pub async fn shutdown(self) -> Result<SinkReport> {
        self.handle.request_shutdown();
        self.join().await
    }

    /// Drops this sink's own handle and waits for the worker to stop.
    ///
    /// The worker stops once shutdown is requested or every other handle
    /// has been dropped too.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Worker`] if the worker task panicked.
    pub async fn join(self) -> Result<SinkReport> {
        let Self { handle, join } = self;
        drop(handle);
        join.await.map_err(|e| SinkError::Worker(e.to_string()))
    }
}
