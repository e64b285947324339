//! Pluggable log stream naming strategies.
//!
//! A provider decides which log stream a sink writes to. A name is either
//! stable (the stream is looked up and reused, adopting its sequence token)
//! or unique per call (a fresh stream is created without a lookup);
//! [`StreamNameProvider::is_unique_per_call`] tells the lifecycle manager
//! which treatment applies. The sink asks for a new name once at
//! initialization and again whenever it rotates streams to escape
//! unrecoverable sequence-token skew.

use uuid::Uuid;

/// Produces the name of the log stream to write to.
pub trait StreamNameProvider: Send + Sync {
    /// Returns the stream name to use.
    fn name(&self) -> String;

    /// Whether every call returns a fresh, never-before-used name.
    ///
    /// Unique names skip the existing-stream lookup: the stream cannot
    /// exist yet, so it is created directly. Appending to one reused stream
    /// from multiple processes has unpredictable results; unique-per-call
    /// providers avoid that entirely.
    fn is_unique_per_call(&self) -> bool {
        false
    }
}

/// Default provider: `{utc-timestamp}_{hostname}_{uuid}`.
///
/// Every call yields a distinct name, so streams are never shared between
/// sink instances or rotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampedNameProvider;

impl StreamNameProvider for TimestampedNameProvider {
    fn name(&self) -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H-%M-%S");
        format!("{timestamp}_{}_{}", host_name(), Uuid::new_v4())
    }

    fn is_unique_per_call(&self) -> bool {
        true
    }
}

/// Stable provider composing `{prefix}[/{hostname}][/{instance-uuid}]`.
///
/// The instance uuid is generated once per provider, so the composed name
/// is computed once and reused for the provider's lifetime. Rotation with
/// this provider therefore re-targets the same name; pick a unique-per-call
/// provider if rotation must land on a fresh stream.
#[derive(Debug, Clone)]
pub struct PrefixedNameProvider {
    name: String,
}

impl PrefixedNameProvider {
    /// Builds the provider from a prefix, optionally appending the local
    /// hostname and a per-instance uuid.
    #[must_use]
    pub fn new(prefix: impl Into<String>, append_host: bool, append_instance_id: bool) -> Self {
        let mut name = prefix.into();
        if append_host {
            name.push('/');
            name.push_str(&host_name());
        }
        if append_instance_id {
            name.push('/');
            name.push_str(&Uuid::new_v4().simple().to_string());
        }
        PrefixedNameProvider { name }
    }
}

impl StreamNameProvider for PrefixedNameProvider {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Provider returning `{prefix}_{uuid}` with a fresh uuid on every call.
#[derive(Debug, Clone)]
pub struct UniqueNameProvider {
    prefix: String,
}

impl UniqueNameProvider {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        UniqueNameProvider {
            prefix: prefix.into(),
        }
    }
}

impl StreamNameProvider for UniqueNameProvider {
    fn name(&self) -> String {
        format!("{}_{}", self.prefix, Uuid::new_v4())
    }

    fn is_unique_per_call(&self) -> bool {
        true
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_names_are_unique() {
        let provider = TimestampedNameProvider;
        assert!(provider.is_unique_per_call());
        assert_ne!(provider.name(), provider.name());
    }

    #[test]
    fn test_prefixed_name_is_stable() {
        let provider = PrefixedNameProvider::new("my-app/worker", true, true);
        assert!(!provider.is_unique_per_call());
        let first = provider.name();
        assert!(first.starts_with("my-app/worker/"));
        assert_eq!(first, provider.name());
    }

    #[test]
    fn test_prefixed_name_without_suffixes() {
        let provider = PrefixedNameProvider::new("my-app/worker", false, false);
        assert_eq!(provider.name(), "my-app/worker");
    }

    #[test]
    fn test_unique_provider_varies_suffix() {
        let provider = UniqueNameProvider::new("my-app");
        assert!(provider.is_unique_per_call());
        let first = provider.name();
        let second = provider.name();
        assert!(first.starts_with("my-app_"));
        assert_ne!(first, second);
    }
}
