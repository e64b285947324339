//! Destination lifecycle management.
//!
//! A [`Destination`] is the `(log group, log stream)` pair one bucket of
//! events uploads to, together with the stream's sequence token and an
//! explicit readiness state:
//!
//! ```text
//!    Unknown ──ensure_group──> GroupReady ──ensure_stream──> StreamReady
//!       ^                          ^
//!       └── repair (structural-missing error)
//!                                  └── rotate_stream (token skew)
//! ```
//!
//! Preparation is idempotent: once `StreamReady`, [`Destination::ensure_ready`]
//! is a no-op until the state is explicitly downgraded by a repair or a
//! rotation. The upload driver owns the downgrades; nothing else mutates a
//! destination.

use tracing::debug;

use crate::client::{ClientError, CloudWatchLogs};
use crate::config::SinkConfig;
use crate::stream_name::StreamNameProvider;

/// Readiness of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationState {
    /// Nothing verified yet.
    Unknown,
    /// The log group exists (or is not ours to create).
    GroupReady,
    /// The log stream exists and the sequence token is current.
    StreamReady,
}

/// Mutable per-destination upload state.
///
/// Exclusively owned by the orchestration path processing its bucket; the
/// retry loop receives it by mutable reference so stream rotation is
/// visible to subsequent batches.
#[derive(Debug, Clone)]
pub struct Destination {
    group: String,
    stream: String,
    sequence_token: Option<String>,
    state: DestinationState,
}

impl Destination {
    /// Creates an unprepared destination for `group`. The stream name is
    /// resolved on first [`ensure_ready`](Self::ensure_ready).
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Destination {
            group: group.into(),
            stream: String::new(),
            sequence_token: None,
            state: DestinationState::Unknown,
        }
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn stream(&self) -> &str {
        &self.stream
    }

    #[must_use]
    pub fn sequence_token(&self) -> Option<&str> {
        self.sequence_token.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> DestinationState {
        self.state
    }

    /// Records the token returned by a successful upload.
    pub fn set_sequence_token(&mut self, token: Option<String>) {
        self.sequence_token = token;
    }

    /// Prepares the destination for its first upload.
    ///
    /// Ensures the log group exists (creating it, with retention, when
    /// configured), resolves the stream name through `provider`, and
    /// ensures the stream exists, adopting its current sequence token. A
    /// destination that is already `StreamReady` returns immediately
    /// without remote calls.
    ///
    /// Any failure leaves the destination unprepared and is fatal for the
    /// current flush cycle of this destination.
    pub async fn ensure_ready(
        &mut self,
        client: &dyn CloudWatchLogs,
        config: &SinkConfig,
        provider: &dyn StreamNameProvider,
    ) -> Result<(), ClientError> {
        if self.state == DestinationState::StreamReady {
            return Ok(());
        }

        self.ensure_group(client, config).await?;

        let fresh = if self.stream.is_empty() {
            self.stream = provider.name();
            self.sequence_token = None;
            provider.is_unique_per_call()
        } else {
            false
        };
        self.ensure_stream(client, fresh).await
    }

    /// Re-ensures group and stream after the backend reported them missing.
    ///
    /// The stream name is kept; structural repair never rotates.
    pub async fn repair(
        &mut self,
        client: &dyn CloudWatchLogs,
        config: &SinkConfig,
    ) -> Result<(), ClientError> {
        self.state = DestinationState::Unknown;
        self.ensure_group(client, config).await?;
        self.ensure_stream(client, false).await
    }

    /// Re-reads the stream's sequence token from the backend.
    ///
    /// A stream absent from the listing resets the token to `None`; the
    /// next upload then starts the stream's token chain over.
    pub async fn refresh_sequence_token(
        &mut self,
        client: &dyn CloudWatchLogs,
    ) -> Result<(), ClientError> {
        let streams = client.describe_log_streams(&self.group, &self.stream).await?;
        self.sequence_token = streams
            .into_iter()
            .find(|s| s.name == self.stream)
            .and_then(|s| s.sequence_token);
        Ok(())
    }

    /// Abandons the current stream and targets a newly named one.
    ///
    /// The sequence token resets (a new stream starts fresh) and readiness
    /// is downgraded until the new stream is ensured.
    pub async fn rotate_stream(
        &mut self,
        client: &dyn CloudWatchLogs,
        provider: &dyn StreamNameProvider,
    ) -> Result<(), ClientError> {
        let previous = std::mem::replace(&mut self.stream, provider.name());
        debug!(
            "SINK | rotating log stream of group {:?}: {previous:?} -> {:?}",
            self.group, self.stream
        );
        self.sequence_token = None;
        self.state = DestinationState::GroupReady;
        self.ensure_stream(client, provider.is_unique_per_call()).await
    }

    /// Verifies the log group exists, creating it when configured to.
    ///
    /// Existence is decided by exact-name match against a prefix-filtered
    /// listing. Retention is applied only to a group this sink creates.
    async fn ensure_group(
        &mut self,
        client: &dyn CloudWatchLogs,
        config: &SinkConfig,
    ) -> Result<(), ClientError> {
        if config.create_log_group {
            let groups = client.describe_log_groups(&self.group).await?;
            if !groups.iter().any(|name| name == &self.group) {
                client.create_log_group(&self.group).await?;
                if let Some(days) = config.retention_policy.days() {
                    client.put_retention_policy(&self.group, days).await?;
                }
            }
        }
        self.state = DestinationState::GroupReady;
        Ok(())
    }

    /// Verifies the stream exists, adopting its token, or creates it.
    ///
    /// `fresh` marks a name that cannot exist yet (unique-per-call
    /// provider); the lookup is skipped and the stream created directly.
    async fn ensure_stream(
        &mut self,
        client: &dyn CloudWatchLogs,
        fresh: bool,
    ) -> Result<(), ClientError> {
        if !fresh {
            let streams = client.describe_log_streams(&self.group, &self.stream).await?;
            if let Some(existing) = streams.into_iter().find(|s| s.name == self.stream) {
                self.sequence_token = existing.sequence_token;
                self.state = DestinationState::StreamReady;
                return Ok(());
            }
        }

        self.sequence_token = None;
        client.create_log_stream(&self.group, &self.stream).await?;
        self.state = DestinationState::StreamReady;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::{LogStream, PutLogEventsResponse};
    use crate::config::RetentionPolicy;
    use crate::record::InputLogEvent;
    use crate::stream_name::PrefixedNameProvider;
    use std::sync::Mutex;

    /// In-memory backend recording every call it receives.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        groups: Mutex<Vec<String>>,
        streams: Mutex<Vec<LogStream>>,
    }

    impl FakeBackend {
        fn with_group(self, name: &str) -> Self {
            self.groups.lock().unwrap().push(name.to_string());
            self
        }

        fn with_stream(self, name: &str, token: Option<&str>) -> Self {
            self.streams.lock().unwrap().push(LogStream {
                name: name.to_string(),
                sequence_token: token.map(str::to_string),
            });
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait::async_trait]
    impl CloudWatchLogs for FakeBackend {
        async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>, ClientError> {
            self.record(format!("describe_groups:{prefix}"));
            Ok(self.groups.lock().unwrap().clone())
        }

        async fn create_log_group(&self, name: &str) -> Result<(), ClientError> {
            self.record(format!("create_group:{name}"));
            self.groups.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn put_retention_policy(&self, name: &str, days: i32) -> Result<(), ClientError> {
            self.record(format!("put_retention:{name}:{days}"));
            Ok(())
        }

        async fn describe_log_streams(
            &self,
            group: &str,
            prefix: &str,
        ) -> Result<Vec<LogStream>, ClientError> {
            self.record(format!("describe_streams:{group}:{prefix}"));
            Ok(self.streams.lock().unwrap().clone())
        }

        async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ClientError> {
            self.record(format!("create_stream:{group}:{stream}"));
            self.streams.lock().unwrap().push(LogStream {
                name: stream.to_string(),
                sequence_token: None,
            });
            Ok(())
        }

        async fn put_log_events(
            &self,
            _group: &str,
            _stream: &str,
            _sequence_token: Option<&str>,
            _events: &[InputLogEvent],
        ) -> Result<PutLogEventsResponse, ClientError> {
            self.record("put_log_events");
            Ok(PutLogEventsResponse {
                next_sequence_token: Some("next".to_string()),
            })
        }
    }

    fn stable_provider() -> PrefixedNameProvider {
        PrefixedNameProvider::new("worker", false, false)
    }

    #[tokio::test]
    async fn test_ensure_ready_creates_group_and_stream() {
        let backend = FakeBackend::default();
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert_eq!(dest.state(), DestinationState::StreamReady);
        assert_eq!(dest.stream(), "worker");
        assert_eq!(
            backend.calls(),
            vec![
                "describe_groups:my-group",
                "create_group:my-group",
                "describe_streams:my-group:worker",
                "create_stream:my-group:worker",
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_ready_applies_retention_on_creation() {
        let backend = FakeBackend::default();
        let mut config = SinkConfig::new("my-group");
        config.retention_policy = RetentionPolicy::OneWeek;
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert!(backend
            .calls()
            .contains(&"put_retention:my-group:7".to_string()));
    }

    #[tokio::test]
    async fn test_existing_group_is_not_recreated() {
        let backend = FakeBackend::default().with_group("my-group");
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert!(!backend.calls().iter().any(|c| c.starts_with("create_group")));
    }

    #[tokio::test]
    async fn test_prefix_match_requires_exact_name() {
        // A group whose name merely starts with ours must not satisfy the
        // existence check.
        let backend = FakeBackend::default().with_group("my-group-extended");
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert!(backend
            .calls()
            .contains(&"create_group:my-group".to_string()));
    }

    #[tokio::test]
    async fn test_existing_stream_token_is_adopted() {
        let backend = FakeBackend::default()
            .with_group("my-group")
            .with_stream("worker", Some("token-42"));
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert_eq!(dest.sequence_token(), Some("token-42"));
        assert!(!backend.calls().iter().any(|c| c.starts_with("create_stream")));
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let backend = FakeBackend::default();
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();
        let calls_after_first = backend.calls().len();

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert_eq!(backend.calls().len(), calls_after_first);
    }

    #[tokio::test]
    async fn test_create_log_group_disabled_skips_group_calls() {
        let backend = FakeBackend::default();
        let mut config = SinkConfig::new("my-group");
        config.create_log_group = false;
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        assert!(!backend.calls().iter().any(|c| c.contains("group")));
    }

    #[tokio::test]
    async fn test_unique_provider_skips_stream_lookup() {
        let backend = FakeBackend::default().with_group("my-group");
        let config = SinkConfig::new("my-group");
        let provider = crate::stream_name::UniqueNameProvider::new("run");
        let mut dest = Destination::new("my-group");

        dest.ensure_ready(&backend, &config, &provider).await.unwrap();

        assert!(!backend.calls().iter().any(|c| c.starts_with("describe_streams")));
        assert!(backend.calls().iter().any(|c| c.starts_with("create_stream")));
    }

    #[tokio::test]
    async fn test_repair_keeps_stream_name() {
        let backend = FakeBackend::default();
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");
        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();

        dest.repair(&backend, &config).await.unwrap();

        assert_eq!(dest.stream(), "worker");
        assert_eq!(dest.state(), DestinationState::StreamReady);
    }

    #[tokio::test]
    async fn test_rotate_stream_changes_name_and_resets_token() {
        let backend = FakeBackend::default().with_group("my-group");
        let config = SinkConfig::new("my-group");
        let provider = crate::stream_name::UniqueNameProvider::new("run");
        let mut dest = Destination::new("my-group");
        dest.ensure_ready(&backend, &config, &provider).await.unwrap();
        dest.set_sequence_token(Some("token-1".to_string()));
        let original = dest.stream().to_string();

        dest.rotate_stream(&backend, &provider).await.unwrap();

        assert_ne!(dest.stream(), original);
        assert!(dest.sequence_token().is_none());
        assert_eq!(dest.state(), DestinationState::StreamReady);
    }

    #[tokio::test]
    async fn test_refresh_sequence_token_reads_backend() {
        let backend = FakeBackend::default()
            .with_group("my-group")
            .with_stream("worker", Some("token-7"));
        let config = SinkConfig::new("my-group");
        let mut dest = Destination::new("my-group");
        dest.ensure_ready(&backend, &config, &stable_provider())
            .await
            .unwrap();
        dest.set_sequence_token(Some("stale".to_string()));

        dest.refresh_sequence_token(&backend).await.unwrap();

        assert_eq!(dest.sequence_token(), Some("token-7"));
    }

    #[tokio::test]
    async fn test_refresh_clears_token_when_stream_is_gone() {
        let backend = FakeBackend::default();
        let mut dest = Destination::new("my-group");
        dest.stream = "worker".to_string();
        dest.set_sequence_token(Some("stale".to_string()));

        dest.refresh_sequence_token(&backend).await.unwrap();

        assert!(dest.sequence_token().is_none());
    }
}
