//! Typed RPC interface to a CloudWatch-compatible logs backend.
//!
//! The sink talks to the backend exclusively through the [`CloudWatchLogs`]
//! trait, so the upload driver and lifecycle manager can be exercised
//! against scripted fakes. [`HttpClient`] is the bundled implementation
//! speaking the JSON-1.1 wire protocol; hosts with their own transport
//! (an SDK, a local emulator shim) implement the trait instead.
//!
//! # Error taxonomy
//!
//! The retry state machine branches on the error class, not on a generic
//! failure: some classes mean the destination structure needs repair, some
//! mean benign token skew, and some are permanently invalid requests that
//! retries cannot fix. [`ClientError`] mirrors the backend's typed errors
//! one-to-one so that classification happens at the transport seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::InputLogEvent;

mod http;

pub use http::HttpClient;

/// Typed failure classes raised by backend operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The backend is temporarily unable to take writes; retriable with
    /// backoff.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The log group or log stream does not exist (anymore).
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The supplied sequence token is stale or wrong for the stream.
    #[error("invalid sequence token: {0}")]
    InvalidSequenceToken(String),

    /// The backend already accepted an identical batch.
    #[error("data already accepted: {0}")]
    DataAlreadyAccepted(String),

    /// The request is malformed; retrying cannot succeed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Transport failure or an error class this crate does not model.
    #[error("request failed: {0}")]
    Transport(String),
}

/// An existing log stream as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStream {
    /// The stream's name within its group.
    pub name: String,
    /// Token required for the next append to this stream, if any.
    pub sequence_token: Option<String>,
}

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutLogEventsResponse {
    /// Token to carry into the next upload against the same stream.
    pub next_sequence_token: Option<String>,
}

/// Operations the sink needs from a CloudWatch-compatible backend.
///
/// Implementations must be safe for concurrent use across independent
/// destinations; the sink never issues concurrent calls for one
/// destination.
#[async_trait]
pub trait CloudWatchLogs: Send + Sync {
    /// Lists log group names starting with `name_prefix`.
    async fn describe_log_groups(&self, name_prefix: &str) -> Result<Vec<String>, ClientError>;

    /// Creates the named log group.
    async fn create_log_group(&self, name: &str) -> Result<(), ClientError>;

    /// Applies a retention period (in days) to the named log group.
    async fn put_retention_policy(&self, name: &str, days: i32) -> Result<(), ClientError>;

    /// Lists streams of `group` whose names start with `name_prefix`.
    async fn describe_log_streams(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ClientError>;

    /// Creates the named stream within `group`.
    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ClientError>;

    /// Appends `events` to `stream`, threading the stream's sequence token.
    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        sequence_token: Option<&str>,
        events: &[InputLogEvent],
    ) -> Result<PutLogEventsResponse, ClientError>;
}
