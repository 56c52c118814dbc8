//! Session clock - pure time arithmetic and display formatting.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Computes the elapsed duration between two instants.
///
/// Presence timestamps are not guaranteed monotonic across event
/// sources, so an `end` before `start` is clamped to zero and logged
/// rather than surfaced as an error.
pub fn elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    if end < start {
        warn!(
            start = %start.to_rfc3339(),
            end = %end.to_rfc3339(),
            skew_ms = (start - end).num_milliseconds(),
            "Clock skew: end precedes start, clamping duration to zero"
        );
        return Duration::zero();
    }
    end - start
}

/// Formats a duration as `{H}h {M}m {S}s` with whole-second truncation.
///
/// This is a display contract only; stored durations keep sub-second
/// precision.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let rem = secs % 60;
    format!("{hours}h {mins}m {rem}s")
}

/// Formats a duration as `H:MM:SS` for leaderboard rows.
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let rem = secs % 60;
    format!("{hours}:{mins:02}:{rem:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn test_elapsed_exact() {
        assert_eq!(elapsed(at(0), at(30)), Duration::seconds(30));
    }

    #[test]
    fn test_elapsed_subsecond_precision() {
        let start = at(0);
        let end = start + Duration::milliseconds(1500);
        assert_eq!(elapsed(start, end), Duration::milliseconds(1500));
    }

    #[test]
    fn test_elapsed_clamps_skew_to_zero() {
        assert_eq!(elapsed(at(30), at(0)), Duration::zero());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(0)), "0h 0m 0s");
        assert_eq!(format_duration(Duration::seconds(30)), "0h 0m 30s");
        assert_eq!(format_duration(Duration::seconds(90)), "0h 1m 30s");
        assert_eq!(format_duration(Duration::seconds(3600 + 125)), "1h 2m 5s");
    }

    #[test]
    fn test_format_duration_truncates_subseconds() {
        assert_eq!(format_duration(Duration::milliseconds(2999)), "0h 0m 2s");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::seconds(0)), "0:00:00");
        assert_eq!(format_clock(Duration::seconds(65)), "0:01:05");
        assert_eq!(format_clock(Duration::seconds(2 * 3600 + 3 * 60 + 4)), "2:03:04");
        assert_eq!(format_clock(Duration::seconds(26 * 3600)), "26:00:00");
    }
}
