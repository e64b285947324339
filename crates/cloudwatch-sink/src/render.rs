//! Pluggable rendering of log records into upload messages.
//!
//! A renderer converts one [`LogRecord`] into the string that is uploaded.
//! Exactly one renderer is active per sink, selected at construction time:
//! either a built-in [`MessageFormat`] choice or a caller-supplied
//! [`EventRenderer`] implementation. Supplying both is a configuration
//! error, not a silent preference.

use std::sync::Arc;

use tracing::error;

use crate::config::{ConfigError, MessageFormat};
use crate::record::LogRecord;

/// Converts a log record into the message text to upload.
///
/// Implementations must not panic; a record that cannot be rendered should
/// degrade to some best-effort text.
pub trait EventRenderer: Send + Sync {
    fn render(&self, record: &LogRecord) -> String;
}

/// Renders the record's message text as-is, dropping structured data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRenderer;

impl EventRenderer for MessageRenderer {
    fn render(&self, record: &LogRecord) -> String {
        record.message.clone()
    }
}

/// Renders the whole record as a single-line JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl EventRenderer for JsonRenderer {
    fn render(&self, record: &LogRecord) -> String {
        match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                // Non-serializable property values should not lose the event.
                error!("SINK | failed to render record as JSON, falling back to message text: {e}");
                record.message.clone()
            }
        }
    }
}

/// Resolves the single active renderer from the configured format and an
/// optional custom implementation.
///
/// # Errors
///
/// [`ConfigError::AmbiguousRenderer`] when a custom renderer is supplied
/// together with a non-default [`MessageFormat`].
pub fn resolve(
    format: MessageFormat,
    custom: Option<Arc<dyn EventRenderer>>,
) -> Result<Arc<dyn EventRenderer>, ConfigError> {
    match (custom, format) {
        (Some(renderer), MessageFormat::RenderedMessage) => Ok(renderer),
        (Some(_), _) => Err(ConfigError::AmbiguousRenderer),
        (None, MessageFormat::RenderedMessage) => Ok(Arc::new(MessageRenderer)),
        (None, MessageFormat::Json) => Ok(Arc::new(JsonRenderer)),
    }
}
