//! Actor-style periodic batching service around the sink.
//!
//! The service owns a bounded queue of pending records and decides *when*
//! the sink uploads: on a periodic timer, on an explicit flush request,
//! and once more while shutting down. The sink itself stays directly
//! callable for hosts that schedule their own flushes.
//!
//! # Actor Pattern
//!
//! ```text
//!    ┌──────────────┐
//!    │  SinkHandle  │ (Clone, many producers)
//!    └──────┬───────┘
//!           │ commands via channel
//!           v
//!    ┌──────────────┐
//!    │ SinkService  │ (single consumer, owns the queue)
//!    └──────┬───────┘
//!           │ emit_batch per cycle
//!           v
//!    ┌──────────────┐
//!    │     Sink     │
//!    └──────────────┘
//! ```
//!
//! # Overflow
//!
//! The queue is bounded by [`SinkConfig::queue_capacity`](crate::config::SinkConfig::queue_capacity).
//! When a record arrives at capacity the oldest pending record is evicted
//! and a warning emitted — the host stays operational under extreme volume
//! at the cost of the oldest data.
//!
//! # Shutdown
//!
//! [`SinkHandle::shutdown`] (or dropping every handle) stops the service:
//! remaining commands are drained, a final flush runs, and the task exits.
//! For prompt termination of a final flush stuck in error backoff, cancel
//! [`crate::sink::Sink::cancel_token`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::record::LogRecord;
use crate::sink::Sink;

/// Commands accepted by the service.
#[derive(Debug)]
pub enum SinkCommand {
    /// Buffer one record for the next flush cycle.
    Emit(LogRecord),
    /// Run a flush cycle now and acknowledge its completion.
    Flush(oneshot::Sender<()>),
    /// Stop the service after a final drain and flush.
    Shutdown,
}

/// Cloneable producer side of the service.
#[derive(Clone, Debug)]
pub struct SinkHandle {
    tx: mpsc::UnboundedSender<SinkCommand>,
}

impl SinkHandle {
    /// Buffers a record without blocking.
    ///
    /// Fails only when the service has shut down.
    pub fn emit(&self, record: LogRecord) -> Result<(), mpsc::error::SendError<SinkCommand>> {
        self.tx.send(SinkCommand::Emit(record))
    }

    /// Flushes buffered records and waits for the cycle to finish.
    pub async fn flush(&self) -> Result<(), String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(SinkCommand::Flush(response_tx))
            .map_err(|e| format!("failed to send flush command: {e}"))?;
        response_rx
            .await
            .map_err(|e| format!("failed to receive flush response: {e}"))
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<SinkCommand>> {
        self.tx.send(SinkCommand::Shutdown)
    }
}

/// Service task owning the pending-record queue.
///
/// Spawn [`run`](Self::run) on the runtime and use the handle to feed it.
pub struct SinkService {
    sink: Arc<Sink>,
    rx: mpsc::UnboundedReceiver<SinkCommand>,
    queue: VecDeque<LogRecord>,
    capacity: usize,
}

impl SinkService {
    /// Creates the service/handle pair for `sink`.
    #[must_use]
    pub fn new(sink: Arc<Sink>) -> (Self, SinkHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let capacity = sink.config().queue_capacity;

        let service = SinkService {
            sink,
            rx,
            queue: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        };
        (service, SinkHandle { tx })
    }

    /// Processes commands and periodic flush ticks until shutdown.
    pub async fn run(mut self) {
        debug!("SINK | batching service started");

        let mut ticker = tokio::time::interval(self.sink.config().upload_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; swallow it so
        // the first scheduled flush happens one full period in.
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(SinkCommand::Emit(record)) => self.buffer(record),
                        Some(SinkCommand::Flush(response_tx)) => {
                            self.flush_cycle().await;
                            if response_tx.send(()).is_err() {
                                debug!("SINK | flush requester went away before the response");
                            }
                        }
                        Some(SinkCommand::Shutdown) | None => {
                            self.drain_pending();
                            self.flush_cycle().await;
                            debug!("SINK | batching service stopped");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.flush_cycle().await;
                }
            }
        }
    }

    /// Buffers one record, evicting the oldest at capacity.
    fn buffer(&mut self, record: LogRecord) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
            warn!(
                "SINK | pending queue full ({} records), dropping oldest record",
                self.capacity
            );
        }
        self.queue.push_back(record);
    }

    /// Moves every record still sitting in the channel into the queue.
    fn drain_pending(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            match command {
                SinkCommand::Emit(record) => self.buffer(record),
                SinkCommand::Flush(response_tx) => {
                    // The final flush below covers this request.
                    let _ = response_tx.send(());
                }
                SinkCommand::Shutdown => {}
            }
        }
    }

    async fn flush_cycle(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let records: Vec<LogRecord> = self.queue.drain(..).collect();
        self.sink.emit_batch(records).await;
    }
}
