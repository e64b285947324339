//! # CloudWatch Sink
//!
//! This crate provides a batching log sink for CloudWatch-compatible log
//! ingestion APIs. It buffers application log records in memory and forwards
//! them as ordered, size-bounded upload batches, driving a small
//! per-destination state machine (log-group/log-stream lifecycle plus
//! sequence-token tracking) to keep uploads flowing through the backend's
//! eventual-consistency quirks.
//!
//! ## Architecture
//!
//! The sink implements a multi-stage pipeline:
//!
//! ```text
//!                     ┌──────────────┐
//!                     │ SinkService  │  (bounded queue, periodic flush)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │     Sink     │  (partition, sort, transform)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │   Batcher    │  (count / byte / span limits)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │   Uploader   │  (retry state machine)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                  ┌─────────────────┐
//!                  │ CloudWatch Logs │
//!                  └─────────────────┘
//! ```
//!
//! ## Components
//!
//! - [`sink`]: Orchestrator turning raw record collections into uploads
//! - [`batch`]: Greedy batch carving under count, byte, and time-span limits
//! - [`lifecycle`]: Log-group/log-stream lifecycle and sequence-token state
//! - [`uploader`]: Per-error-class retry state machine with backoff
//! - [`client`]: Typed RPC interface to the backend, plus an HTTP client
//! - [`service`]: Actor-style periodic flush service around the sink
//! - [`render`], [`stream_name`], [`transform`]: pluggable capabilities
//!
//! ## Failure Policy
//!
//! No error escapes the emit path. Failures are diagnosed on the `tracing`
//! channel and result in the affected batch or bucket being dropped; the
//! host application never observes an exception from logging calls.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_copy_implementations)]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

/// Greedy batch construction under backend protocol limits
pub mod batch;

/// Typed RPC interface to the backend and the HTTP implementation
pub mod client;

/// Sink configuration snapshot and validation
pub mod config;

/// Backend protocol limits
pub mod constants;

/// Destination (log group / log stream) lifecycle state machine
pub mod lifecycle;

/// Input and transformed log event values
pub mod record;

/// Pluggable log record rendering
pub mod render;

/// Actor-style periodic batching service
pub mod service;

/// Batch orchestration entry point
pub mod sink;

/// Pluggable log stream naming strategies
pub mod stream_name;

/// Record rendering, truncation, and timestamp normalization
pub mod transform;

/// Upload driver and retry state machine
pub mod uploader;

pub use batch::Batcher;
pub use client::{ClientError, CloudWatchLogs, HttpClient, LogStream, PutLogEventsResponse};
pub use config::{ConfigError, MessageFormat, RetentionPolicy, SinkConfig};
pub use record::{InputLogEvent, Level, LogRecord};
pub use render::{EventRenderer, JsonRenderer, MessageRenderer};
pub use service::{SinkHandle, SinkService};
pub use sink::Sink;
pub use stream_name::{
    PrefixedNameProvider, StreamNameProvider, TimestampedNameProvider, UniqueNameProvider,
};
