//! crates/attendance_core/src/duration.rs
//!
//! Net worked time and its display form.

use chrono::{DateTime, Utc};

/// Whole seconds between clock-in and clock-out minus rest, never negative.
pub fn work_seconds(
    clock_in: DateTime<Utc>,
    clock_out: DateTime<Utc>,
    accumulated_rest_seconds: i64,
) -> i64 {
    let elapsed = (clock_out - clock_in).num_seconds();
    elapsed.saturating_sub(accumulated_rest_seconds).max(0)
}

/// Formats seconds as `HH:MM`. Hours are not wrapped at 24.
pub fn format_hhmm(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{:02}:{:02}", hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn rest_is_subtracted() {
        let secs = work_seconds(t0(), t0() + Duration::seconds(600), 120);
        assert_eq!(secs, 480);
        assert_eq!(format_hhmm(secs), "00:08");
    }

    #[test]
    fn rest_longer_than_elapsed_clamps_to_zero() {
        assert_eq!(work_seconds(t0(), t0() + Duration::seconds(60), 3600), 0);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        assert_eq!(work_seconds(t0(), t0() - Duration::seconds(30), 0), 0);
    }

    #[test]
    fn partial_seconds_are_floored() {
        let secs = work_seconds(t0(), t0() + Duration::milliseconds(59_999), 0);
        assert_eq!(secs, 59);
    }

    #[test]
    fn hours_run_past_a_day() {
        assert_eq!(format_hhmm(27 * 3600 + 5 * 60 + 59), "27:05");
        assert_eq!(format_hhmm(0), "00:00");
    }
}
