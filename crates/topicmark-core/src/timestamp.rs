//! Timestamp normalization.
//!
//! Everything user-visible is zero-padded `HH:MM:SS`. Model output and
//! caption offsets both funnel through here so the two derivation paths
//! cannot drift apart.

/// Decompose whole seconds into zero-padded `HH:MM:SS`.
///
/// Fractional seconds are truncated, matching how caption offsets are
/// displayed to users (a topic never starts "mid-second" for our purposes).
pub fn hms_from_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Coerce any textual time representation into zero-padded `HH:MM:SS`.
///
/// - 2 fields: treated as `MM:SS`, hours become `00`.
/// - 3 fields: each field zero-padded to at least 2 digits (hours wider
///   than 2 digits are kept as-is).
/// - anything else: `00:00:00`.
///
/// Idempotent on already-normalized input.
pub fn normalize_timestamp(raw: &str) -> String {
    fn pad2(s: &str) -> String {
        format!("{:0>2}", s.trim())
    }

    let parts: Vec<&str> = raw.trim().split(':').collect();
    match parts.as_slice() {
        [m, s] => format!("00:{}:{}", pad2(m), pad2(s)),
        [h, m, s] => format!("{}:{}:{}", pad2(h), pad2(m), pad2(s)),
        _ => "00:00:00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_decompose_into_hms() {
        assert_eq!(hms_from_seconds(0.0), "00:00:00");
        assert_eq!(hms_from_seconds(347.0), "00:05:47");
        assert_eq!(hms_from_seconds(347.9), "00:05:47");
        assert_eq!(hms_from_seconds(3600.0), "01:00:00");
        assert_eq!(hms_from_seconds(3661.0), "01:01:01");
    }

    #[test]
    fn negative_and_non_finite_seconds_clamp_to_zero() {
        assert_eq!(hms_from_seconds(-5.0), "00:00:00");
        assert_eq!(hms_from_seconds(f64::NAN), "00:00:00");
        assert_eq!(hms_from_seconds(f64::INFINITY), "00:00:00");
    }

    #[test]
    fn normalize_is_idempotent_on_normalized_input() {
        assert_eq!(normalize_timestamp("01:02:03"), "01:02:03");
        assert_eq!(
            normalize_timestamp(&normalize_timestamp("01:02:03")),
            "01:02:03"
        );
    }

    #[test]
    fn two_fields_are_minutes_and_seconds() {
        assert_eq!(normalize_timestamp("5:47"), "00:05:47");
        assert_eq!(normalize_timestamp("05:47"), "00:05:47");
    }

    #[test]
    fn three_fields_are_zero_padded() {
        assert_eq!(normalize_timestamp("1:2:3"), "01:02:03");
        assert_eq!(normalize_timestamp(" 1:23:45 "), "01:23:45");
    }

    #[test]
    fn hours_wider_than_two_digits_are_kept() {
        assert_eq!(normalize_timestamp("123:00:01"), "123:00:01");
    }

    #[test]
    fn garbage_defaults_to_zero() {
        assert_eq!(normalize_timestamp("abc"), "00:00:00");
        assert_eq!(normalize_timestamp(""), "00:00:00");
        assert_eq!(normalize_timestamp("1:2:3:4"), "00:00:00");
    }
}
