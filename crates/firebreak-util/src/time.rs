//! Time utilities for firebreakd
//!
//! Session deadlines are wall-clock instants persisted as epoch
//! milliseconds: the timer that enforces them lives outside the process
//! and must survive restarts, so monotonic time is of no use here. All
//! state-machine operations take `now` as a parameter instead of reading
//! a global clock, which keeps expiry logic testable.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Get the current wall-clock time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert an instant to the epoch-millisecond representation used in
/// the persisted state schema.
pub fn to_epoch_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Convert persisted epoch milliseconds back to an instant. Returns
/// `None` for values outside chrono's representable range.
pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Time remaining until `end`, saturating at zero when `end` has passed.
pub fn remaining_until(end: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (end - now).to_std().unwrap_or(Duration::ZERO)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_ms_round_trip() {
        let dt = Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        let ms = to_epoch_ms(dt);
        assert_eq!(from_epoch_ms(ms), Some(dt));
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let now = Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 0).unwrap();
        let end = now + chrono::Duration::seconds(90);

        assert_eq!(remaining_until(end, now), Duration::from_secs(90));
        assert_eq!(remaining_until(now, end), Duration::ZERO);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn now_returns_reasonable_time() {
        let t = now();
        assert!(t.timestamp() > 1_600_000_000);
    }
}
