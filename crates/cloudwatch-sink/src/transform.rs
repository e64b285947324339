//! Record transformation: rendering, truncation, and UTC normalization.
//!
//! Each [`LogRecord`] becomes exactly one [`InputLogEvent`]. The message is
//! produced by the active renderer and truncated to
//! [`MAX_EVENT_BYTES`](crate::constants::MAX_EVENT_BYTES) if needed;
//! truncation never splits a multi-byte UTF-8 code point, so the result may
//! be up to three bytes short of the limit. The timestamp is converted to
//! UTC here, once, and is immutable afterwards.

use chrono::Utc;
use tracing::warn;

use crate::constants::MAX_EVENT_BYTES;
use crate::record::{InputLogEvent, LogRecord};
use crate::render::EventRenderer;

/// Renders a record and produces the event that will be uploaded.
///
/// Oversized messages are truncated rather than dropped; the original
/// length is reported on the diagnostic channel.
#[must_use]
pub fn transform(record: &LogRecord, renderer: &dyn EventRenderer) -> InputLogEvent {
    let mut message = renderer.render(record);

    if message.len() > MAX_EVENT_BYTES {
        let original_len = message.len();
        message.truncate(floor_char_boundary(&message, MAX_EVENT_BYTES));
        warn!(
            "SINK | truncating log event from {original_len} to {} bytes",
            message.len()
        );
    }

    InputLogEvent {
        timestamp: record.timestamp.with_timezone(&Utc),
        message,
    }
}

/// Largest index `<= max` that falls on a UTF-8 character boundary of `s`.
///
/// A UTF-8 code point is at most four bytes, so the scan retreats at most
/// three positions.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    debug_assert!(max <= s.len());
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::Level;
    use crate::render::MessageRenderer;
    use chrono::{FixedOffset, TimeZone};

    fn create_test_record(message: String) -> LogRecord {
        let ts = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 14, 30, 0)
            .unwrap();
        LogRecord::new(ts, Level::Info, message)
    }

    #[test]
    fn test_timestamp_normalized_to_utc() {
        let record = create_test_record("hello".to_string());
        let event = transform(&record, &MessageRenderer);

        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(event.timestamp, expected);
        assert_eq!(event.message, "hello");
    }

    #[test]
    fn test_short_message_untouched() {
        let record = create_test_record("a".repeat(MAX_EVENT_BYTES));
        let event = transform(&record, &MessageRenderer);
        assert_eq!(event.message.len(), MAX_EVENT_BYTES);
    }

    #[test]
    fn test_oversized_ascii_truncated_to_limit() {
        let record = create_test_record("a".repeat(MAX_EVENT_BYTES + 1000));
        let event = transform(&record, &MessageRenderer);
        assert_eq!(event.message.len(), MAX_EVENT_BYTES);
    }

    #[test]
    fn test_truncation_respects_multibyte_boundary() {
        // U+00E9 is two bytes in UTF-8; an odd limit would split one.
        let record = create_test_record("é".repeat(MAX_EVENT_BYTES));
        let event = transform(&record, &MessageRenderer);

        assert!(event.message.len() <= MAX_EVENT_BYTES);
        assert!(event.message.is_char_boundary(event.message.len()));
        // MAX_EVENT_BYTES is even, so the full budget is usable here.
        assert_eq!(event.message.len(), MAX_EVENT_BYTES);
    }

    #[test]
    fn test_truncation_backs_off_for_wide_chars() {
        // Four-byte code points with a limit that lands mid-character.
        let message = "\u{1F600}".repeat(MAX_EVENT_BYTES / 4 + 10);
        let record = create_test_record(message);
        let event = transform(&record, &MessageRenderer);

        assert!(event.message.len() <= MAX_EVENT_BYTES);
        assert_eq!(event.message.len() % 4, 0);
        assert!(std::str::from_utf8(event.message.as_bytes()).is_ok());
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "aé"; // 1 + 2 bytes
        assert_eq!(floor_char_boundary(s, 3), 3);
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 1), 1);
        assert_eq!(floor_char_boundary(s, 0), 0);
    }
}
