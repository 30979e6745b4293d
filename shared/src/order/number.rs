//! Human-readable order numbers: `ORD-YYYYMMDD-NNNN`

use chrono::{DateTime, Utc};

/// UTC calendar day of a millisecond timestamp as `YYYYMMDD`
pub fn day_key(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .format("%Y%m%d")
        .to_string()
}

/// Sequence is zero padded to at least four digits
pub fn format_order_number(day: &str, seq: i64) -> String {
    format!("ORD-{day}-{seq:04}")
}

/// True for values shaped like a sequence-assigned number
///
/// Externally supplied ids must never take this shape, or they could claim a
/// number the daily counter hands out later.
pub fn is_sequence_number(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("ORD-") else {
        return false;
    };
    let Some((day, seq)) = rest.split_once('-') else {
        return false;
    };
    day.len() == 8
        && day.bytes().all(|b| b.is_ascii_digit())
        && !seq.is_empty()
        && seq.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_uses_utc() {
        // 2025-03-09T23:59:59.999Z
        assert_eq!(day_key(1_741_564_799_999), "20250309");
        assert_eq!(day_key(1_741_564_800_000), "20250310");
    }

    #[test]
    fn sequence_is_padded() {
        assert_eq!(format_order_number("20250310", 1), "ORD-20250310-0001");
        assert_eq!(format_order_number("20250310", 42), "ORD-20250310-0042");
        assert_eq!(format_order_number("20250310", 12345), "ORD-20250310-12345");
    }

    #[test]
    fn recognises_sequence_shape() {
        assert!(is_sequence_number("ORD-20261018-0001"));
        assert!(is_sequence_number(&format_order_number("20250310", 12345)));
        assert!(!is_sequence_number("ORD-2026101-0001"));
        assert!(!is_sequence_number("ORD-20261018-"));
        assert!(!is_sequence_number("ORD-20261018-00a1"));
        assert!(!is_sequence_number("mid_ORD-20261018-0001"));
        assert!(!is_sequence_number("order_1697600000000"));
    }
}
