//! Greedy batch construction under backend protocol limits.
//!
//! A batch is a contiguous prefix of the pending queue satisfying three
//! independent limits at once:
//!
//! 1. **Count limit**: at most [`MAX_BATCH_EVENTS`](crate::constants::MAX_BATCH_EVENTS) events
//! 2. **Size limit**: cumulative message bytes plus per-event overhead stay
//!    strictly below [`MAX_BATCH_BYTES`](crate::constants::MAX_BATCH_BYTES)
//! 3. **Span limit**: newest minus oldest timestamp within
//!    [`MAX_BATCH_SPAN`](crate::constants::MAX_BATCH_SPAN)
//!
//! Events are consumed from the front of the queue until the next event
//! would cross a limit; that event is left in place and starts the next
//! batch. A non-empty queue always yields at least one event per batch —
//! an event that alone crosses the byte limit (possible only with
//! test-sized limits, since transformation truncates well below the real
//! one) still produces a one-event batch rather than an empty batch or an
//! infinite loop.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::TimeDelta;

use crate::constants;
use crate::record::InputLogEvent;

/// Carves upload batches off a pending queue.
///
/// Limits are fixed at construction; [`Batcher::default`] uses the backend
/// protocol limits and custom limits exist for tests only.
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    max_events: usize,
    max_bytes: usize,
    max_span: TimeDelta,
}

impl Default for Batcher {
    fn default() -> Self {
        Batcher::new(
            constants::MAX_BATCH_EVENTS,
            constants::MAX_BATCH_BYTES,
            constants::MAX_BATCH_SPAN,
        )
    }
}

impl Batcher {
    /// Creates a batcher with explicit limits.
    #[must_use]
    pub fn new(max_events: usize, max_bytes: usize, max_span: Duration) -> Self {
        Batcher {
            max_events,
            max_bytes,
            max_span: TimeDelta::from_std(max_span).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Dequeues and returns the next batch.
    ///
    /// Returns an empty batch only when the queue is empty. The queue must
    /// already be sorted ascending by timestamp; the span check relies on
    /// the first event being the oldest.
    #[must_use]
    pub fn next_batch(&self, queue: &mut VecDeque<InputLogEvent>) -> Vec<InputLogEvent> {
        let mut first_timestamp = None;
        let mut batch_bytes = 0usize;
        let mut batch = Vec::new();

        while batch.len() < self.max_events {
            let Some(event) = queue.front() else {
                break;
            };

            match first_timestamp {
                None => first_timestamp = Some(event.timestamp),
                Some(first) => {
                    if event.timestamp.signed_duration_since(first) > self.max_span {
                        break;
                    }
                }
            }

            let proposed = batch_bytes + event.batch_bytes();
            if proposed >= self.max_bytes && !batch.is_empty() {
                break;
            }

            batch_bytes = proposed;
            if let Some(event) = queue.pop_front() {
                batch.push(event);
            }
        }

        batch
    }
}
