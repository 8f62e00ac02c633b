//! Time representation.
//!
//! All timestamps are timezone-aware (`DateTime<FixedOffset>`) so a plan
//! round-trips through JSON with its original offset. Durations are
//! expressed in fractional hours at the API surface and converted to
//! microsecond-resolution `chrono::Duration` internally.

use chrono::{DateTime, Duration, FixedOffset};

/// A timezone-aware instant.
pub type Timestamp = DateTime<FixedOffset>;

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

/// Largest accepted duration, lag, slack or jitter (hours, ~114 years).
pub const MAX_HOURS: f64 = 1_000_000.0;

/// Whether `h` is a usable hour figure: finite and within `0..=MAX_HOURS`.
#[inline]
pub fn is_valid_hours(h: f64) -> bool {
    h.is_finite() && (0.0..=MAX_HOURS).contains(&h)
}

/// Converts fractional hours to a duration (microsecond resolution).
#[inline]
pub fn hours(h: f64) -> Duration {
    Duration::microseconds((h * MICROS_PER_HOUR).round() as i64)
}

/// Converts a duration to fractional hours.
#[inline]
pub fn as_hours(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_HOUR,
        // Beyond ~292k years; millisecond precision is plenty there.
        None => d.num_milliseconds() as f64 / 3_600_000.0,
    }
}

/// Parses an RFC 3339 timestamp; a space is accepted in place of `T`.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    raw.trim().parse::<Timestamp>()
}

/// Rounds a reported figure to two decimals.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_roundtrip() {
        assert_eq!(hours(1.0), Duration::hours(1));
        assert_eq!(hours(0.5), Duration::minutes(30));
        assert!((as_hours(Duration::minutes(90)) - 1.5).abs() < 1e-10);
        assert_eq!(hours(0.0), Duration::zero());
    }

    #[test]
    fn test_parse_timestamp_separators() {
        let a = parse_timestamp("2025-08-09T08:00:00+08:00").unwrap();
        let b = parse_timestamp("2025-08-09 08:00:00+08:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.offset().local_minus_utc(), 8 * 3600);
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2025-08-09T08:00:00").is_err()); // no offset
    }

    #[test]
    fn test_valid_hours() {
        assert!(is_valid_hours(0.0));
        assert!(is_valid_hours(MAX_HOURS));
        assert!(!is_valid_hours(MAX_HOURS + 1.0));
        assert!(!is_valid_hours(1e9));
        assert!(!is_valid_hours(-0.5));
        assert!(!is_valid_hours(f64::NAN));
        assert!(!is_valid_hours(f64::INFINITY));
    }

    #[test]
    fn test_round2() {
        assert!((round2(1.23456) - 1.23).abs() < 1e-10);
        assert!((round2(66.666_666) - 66.67).abs() < 1e-10);
        assert!((round2(-0.125_1) - -0.13).abs() < 1e-10);
    }
}
