//! Log event values flowing through the sink.
//!
//! Two shapes exist: [`LogRecord`] is the immutable input produced by the
//! host application's logging pipeline, and [`InputLogEvent`] is the
//! transformed value actually uploaded — a rendered message pinned to a UTC
//! timestamp. The conversion (rendering, truncation, UTC normalization)
//! lives in [`crate::transform`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Severity level of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(name)
    }
}

/// A structured log event as produced by the host application.
///
/// Records are consumed read-only by the sink and never mutated. The
/// timestamp carries its original offset; it is converted to UTC exactly
/// once, during transformation.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// When the event occurred, in the producer's local offset.
    pub timestamp: DateTime<FixedOffset>,

    /// Severity of the event.
    pub level: Level,

    /// The rendered message text.
    pub message: String,

    /// Structured properties attached to the event.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Optional key selecting the destination log group for this record.
    ///
    /// Only consulted when [`crate::config::SinkConfig::group_routing`] is
    /// enabled; records without a key fall back to the configured group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
}

impl LogRecord {
    /// Creates a record with the given timestamp, level, and message and no
    /// properties or routing key.
    #[must_use]
    pub fn new(timestamp: DateTime<FixedOffset>, level: Level, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp,
            level,
            message: message.into(),
            properties: BTreeMap::new(),
            routing_key: None,
        }
    }
}

/// A transformed event ready for upload.
///
/// The message is final (rendered and truncated) and the timestamp is UTC.
/// Collections of these destined for one upload are sorted ascending by
/// timestamp before batching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLogEvent {
    /// UTC timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Final message text; UTF-8 byte length never exceeds
    /// [`crate::constants::MAX_EVENT_BYTES`].
    pub message: String,
}

impl InputLogEvent {
    /// Byte cost of this event against the batch size limit.
    #[must_use]
    pub fn batch_bytes(&self) -> usize {
        self.message.len() + crate::constants::EVENT_OVERHEAD_BYTES
    }
}
