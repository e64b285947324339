//! Sink configuration.
//!
//! [`SinkConfig`] is an immutable snapshot taken at sink construction; none
//! of its fields may change for the lifetime of the sink. Backend protocol
//! limits (batch size, count, span) are deliberately *not* part of the
//! configuration — they live in [`crate::constants`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of retry attempts for a failed upload.
pub const DEFAULT_RETRY_ATTEMPTS: u8 = 5;

/// Default period between scheduled flushes.
pub const DEFAULT_UPLOAD_PERIOD: Duration = Duration::from_secs(10);

/// Default capacity of the service's pending-record queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Error raised when a configuration snapshot is rejected.
#[derive(Debug, Clone, Copy, Error)]
pub enum ConfigError {
    /// The log group name is required and was empty.
    #[error("log_group_name must be specified")]
    MissingLogGroup,

    /// A custom renderer and a non-default message format were both set.
    #[error("a custom renderer and a message format were both supplied; choose one")]
    AmbiguousRenderer,

    /// The service queue must hold at least one record.
    #[error("queue_capacity must be greater than 0")]
    ZeroQueueCapacity,
}

/// Built-in message rendering choices.
///
/// Exactly one rendering capability is active per sink. Supplying a custom
/// [`crate::render::EventRenderer`] together with a non-default format here
/// is rejected at construction rather than silently preferring one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// Upload the record's rendered message text as-is.
    #[default]
    RenderedMessage,
    /// Upload the whole record serialized as a JSON object.
    Json,
}

/// Retention period applied to a log group this sink creates.
///
/// The variants are the day counts the backend's retention API accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep log events forever; no retention call is made.
    #[default]
    Indefinite,
    OneDay,
    ThreeDays,
    FiveDays,
    OneWeek,
    TwoWeeks,
    OneMonth,
    TwoMonths,
    ThreeMonths,
    FourMonths,
    FiveMonths,
    SixMonths,
    OneYear,
    ThirteenMonths,
    EighteenMonths,
    TwoYears,
    FiveYears,
    TenYears,
}

impl RetentionPolicy {
    /// The retention period in days, or `None` for indefinite retention.
    #[must_use]
    pub fn days(self) -> Option<i32> {
        match self {
            RetentionPolicy::Indefinite => None,
            RetentionPolicy::OneDay => Some(1),
            RetentionPolicy::ThreeDays => Some(3),
            RetentionPolicy::FiveDays => Some(5),
            RetentionPolicy::OneWeek => Some(7),
            RetentionPolicy::TwoWeeks => Some(14),
            RetentionPolicy::OneMonth => Some(30),
            RetentionPolicy::TwoMonths => Some(60),
            RetentionPolicy::ThreeMonths => Some(90),
            RetentionPolicy::FourMonths => Some(120),
            RetentionPolicy::FiveMonths => Some(150),
            RetentionPolicy::SixMonths => Some(180),
            RetentionPolicy::OneYear => Some(365),
            RetentionPolicy::ThirteenMonths => Some(400),
            RetentionPolicy::EighteenMonths => Some(545),
            RetentionPolicy::TwoYears => Some(731),
            RetentionPolicy::FiveYears => Some(1827),
            RetentionPolicy::TenYears => Some(3653),
        }
    }
}

/// Immutable configuration snapshot for one sink instance.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Destination log group. Required unless every record routes itself
    /// via [`group_routing`](Self::group_routing).
    pub log_group_name: String,

    /// Create the log group (and apply [`retention_policy`](Self::retention_policy))
    /// if it does not exist yet.
    pub create_log_group: bool,

    /// Retention applied to a log group this sink creates. Ignored for
    /// pre-existing groups.
    pub retention_policy: RetentionPolicy,

    /// Retry ceiling for one batch; attempt indices run `0..=retry_attempts`.
    pub retry_attempts: u8,

    /// Period between scheduled flushes when running under
    /// [`crate::service::SinkService`].
    pub upload_period: Duration,

    /// Bound on the service's pending-record queue; the oldest record is
    /// evicted when a new record arrives at capacity.
    pub queue_capacity: usize,

    /// Partition each flush by the records' routing keys, selecting the
    /// destination log group per record.
    pub group_routing: bool,

    /// Built-in rendering choice; see [`MessageFormat`].
    pub format: MessageFormat,

    /// Whether repairing a missing group/stream consumes retry budget.
    ///
    /// Structural repair is not a rate problem, so it does not count by
    /// default.
    pub structural_recovery_counts_attempt: bool,

    /// Optional pause between consecutive successful batches of one flush.
    pub inter_batch_delay: Option<Duration>,
}

impl SinkConfig {
    /// Creates a configuration for the given log group with defaults
    /// matching the backend's recommended usage.
    #[must_use]
    pub fn new(log_group_name: impl Into<String>) -> Self {
        SinkConfig {
            log_group_name: log_group_name.into(),
            create_log_group: true,
            retention_policy: RetentionPolicy::Indefinite,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            upload_period: DEFAULT_UPLOAD_PERIOD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            group_routing: false,
            format: MessageFormat::default(),
            structural_recovery_counts_attempt: false,
            inter_batch_delay: None,
        }
    }

    /// Validates the snapshot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_group_name.is_empty() {
            return Err(ConfigError::MissingLogGroup);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SinkConfig::new("my-app");
        assert_eq!(config.log_group_name, "my-app");
        assert!(config.create_log_group);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.upload_period, Duration::from_secs(10));
        assert_eq!(config.queue_capacity, 10_000);
        assert!(!config.structural_recovery_counts_attempt);
        assert!(config.inter_batch_delay.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_group_name_rejected() {
        let config = SinkConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingLogGroup)
        ));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let mut config = SinkConfig::new("my-app");
        config.queue_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroQueueCapacity)
        ));
    }

    #[test]
    fn test_retention_days() {
        assert_eq!(RetentionPolicy::Indefinite.days(), None);
        assert_eq!(RetentionPolicy::OneWeek.days(), Some(7));
        assert_eq!(RetentionPolicy::ThirteenMonths.days(), Some(400));
        assert_eq!(RetentionPolicy::TenYears.days(), Some(3653));
    }
}
