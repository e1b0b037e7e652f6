//! Time-window arithmetic shared by expiry, timelock, delay and cooldown
//!
//! Boundaries:
//! - expiry is strict: a request expires only once `now > start + duration`
//! - delays are inclusive: a delay has elapsed at exactly `start + duration`
//! - approval windows are inclusive: an approval exactly `window` old counts

use chrono::Duration;

use crate::clock::Timestamp;

/// `start + duration`, saturating at the representable maximum
pub fn deadline(start: Timestamp, duration: Duration) -> Timestamp {
    start
        .checked_add_signed(duration)
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}

/// True once `now` is strictly after `start + duration`
pub fn deadline_passed(start: Timestamp, duration: Duration, now: Timestamp) -> bool {
    now > deadline(start, duration)
}

/// True from `start + duration` onwards (boundary inclusive)
pub fn delay_elapsed(start: Timestamp, duration: Duration, now: Timestamp) -> bool {
    now >= deadline(start, duration)
}

/// True while an event at `at` is no older than `window` at `now`
pub fn within_window(at: Timestamp, window: Duration, now: Timestamp) -> bool {
    now <= deadline(at, window)
}

/// Time left until `start + duration`, zero if already reached
pub fn remaining(start: Timestamp, duration: Duration, now: Timestamp) -> Duration {
    let end = deadline(start, duration);
    if now >= end {
        Duration::zero()
    } else {
        end - now
    }
}

/// Serde adapter storing a `chrono::Duration` as whole seconds
///
/// Use with `#[serde(with = "quorum_core::window::secs")]`.
pub mod secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs).ok_or_else(|| serde::de::Error::custom("duration out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_delay_boundary_inclusive() {
        let start = Utc::now();
        let delay = Duration::hours(24);

        assert!(!delay_elapsed(start, delay, start + Duration::hours(24) - Duration::seconds(1)));
        assert!(delay_elapsed(start, delay, start + Duration::hours(24)));
    }

    #[test]
    fn test_deadline_boundary_strict() {
        let start = Utc::now();
        let ttl = Duration::hours(1);

        assert!(!deadline_passed(start, ttl, start + ttl));
        assert!(deadline_passed(start, ttl, start + ttl + Duration::seconds(1)));
    }

    #[test]
    fn test_within_window() {
        let at = Utc::now();
        let window = Duration::minutes(10);

        assert!(within_window(at, window, at + window));
        assert!(!within_window(at, window, at + window + Duration::seconds(1)));
    }

    #[test]
    fn test_remaining() {
        let start = Utc::now();
        assert_eq!(
            remaining(start, Duration::hours(2), start + Duration::hours(1)),
            Duration::hours(1)
        );
        assert_eq!(
            remaining(start, Duration::hours(2), start + Duration::hours(3)),
            Duration::zero()
        );
    }

    #[test]
    fn test_deadline_saturates() {
        let start = Utc::now();
        assert!(!deadline_passed(start, Duration::MAX, start));
    }
}
