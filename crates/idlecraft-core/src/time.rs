//! Wall-clock time for the ledger
//!
//! Every operation takes `now` as an explicit input. The engine reads it
//! from a [`Clock`] so sweeps and handlers can be driven by a
//! [`ManualClock`] in tests.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Real UTC wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Set the current time
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Convert a duration in (possibly fractional) seconds to whole milliseconds
pub fn secs_to_millis(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

/// Restore a persisted millisecond timestamp
///
/// A value chrono cannot represent means the stored row is corrupt.
pub fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::Storage(format!("stored timestamp {} ms is out of range", ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_secs_to_millis() {
        assert_eq!(secs_to_millis(1.0), 1000);
        assert_eq!(secs_to_millis(2.5), 2500);
        assert_eq!(secs_to_millis(0.0004), 0);
    }

    #[test]
    fn test_millis_round_trip() {
        let t = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(from_millis(t.timestamp_millis()).unwrap(), t);
    }

    #[test]
    fn test_out_of_range_millis_is_an_error() {
        let err = from_millis(i64::MAX).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
    }
}
