//! Constants for CloudWatch Logs API limits.
//!
//! This module defines the size, count, and time-span limits the backend
//! enforces on `PutLogEvents` requests, plus the starting interval for error
//! backoff. The values encode backend protocol constraints and are not
//! runtime-configurable; [`crate::batch::Batcher::new`] accepts explicit
//! limits so tests can exercise boundary behavior with small numbers.
//!
//! # API Constraints
//!
//! - **Event size**: each message is limited to 256 KiB including a 26-byte
//!   per-message overhead the backend reserves
//! - **Batch size**: the cumulative payload of one request must stay below
//!   1 MiB, again counting 26 bytes of overhead per message
//! - **Batch count**: at most 10,000 events per request
//! - **Batch span**: events in one request must not span more than 24 hours

use std::time::Duration;

/// Maximum size in bytes of a single event message.
///
/// 256 KiB minus the 26-byte per-message overhead reserved by the backend.
/// Messages longer than this are truncated during transformation, never
/// dropped.
pub const MAX_EVENT_BYTES: usize = 262_118;

/// Maximum cumulative batch payload size in bytes.
///
/// The sum of every message's UTF-8 byte length plus
/// [`EVENT_OVERHEAD_BYTES`] per event must stay strictly below this limit.
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Maximum number of events per upload batch.
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Per-message overhead in bytes the backend charges against the batch size.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Maximum timestamp spread between the earliest and latest event in a batch.
pub const MAX_BATCH_SPAN: Duration = Duration::from_secs(24 * 60 * 60);

/// Starting interval for exponential error backoff.
///
/// Attempt `n` against an unavailable backend waits `BACKOFF_BASE * 2^n`
/// before resubmitting.
pub const BACKOFF_BASE: Duration = Duration::from_millis(100);
