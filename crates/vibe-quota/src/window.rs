//! Usage windows and time source.
//!
//! Counters are bucketed by explicit window keys computed from a UTC
//! timestamp: one bucket per calendar day and one per epoch minute.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::RwLock;

/// Length of the per-minute window in milliseconds.
pub const MINUTE_WINDOW_MS: u64 = 60_000;

/// Day bucket for `now`, formatted `YYYY-MM-DD` (UTC).
#[must_use]
pub fn daily_window_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Minute bucket for `now`: whole minutes since the Unix epoch.
#[must_use]
pub fn minute_window_key(now: DateTime<Utc>) -> String {
    now.timestamp().div_euclid(60).to_string()
}

/// Milliseconds left before the minute bucket containing `now` closes.
#[must_use]
pub fn millis_until_next_minute(now: DateTime<Utc>) -> u64 {
    let elapsed = now.timestamp_millis().rem_euclid(MINUTE_WINDOW_MS as i64) as u64;
    MINUTE_WINDOW_MS - elapsed
}

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_key_is_utc_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(daily_window_key(now), "2026-03-01");
        assert_eq!(
            daily_window_key(now + chrono::Duration::seconds(1)),
            "2026-03-02"
        );
    }

    #[test]
    fn test_minute_key_changes_on_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 59).unwrap();
        let next = now + chrono::Duration::seconds(1);
        assert_ne!(minute_window_key(now), minute_window_key(next));
        assert_eq!(
            minute_window_key(next),
            minute_window_key(next + chrono::Duration::seconds(59))
        );
    }

    #[test]
    fn test_millis_until_next_minute() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(millis_until_next_minute(start), 60_000);
        let later = start + chrono::Duration::milliseconds(45_500);
        assert_eq!(millis_until_next_minute(later), 14_500);
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(clock.now(), start + chrono::Duration::minutes(5));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
