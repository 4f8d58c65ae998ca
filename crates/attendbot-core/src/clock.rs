//! Time source abstraction.
//!
//! All timestamps in the system live in one fixed-offset zone (the
//! office zone, UTC+7 by default). The [`Clock`] trait exists so tests
//! can drive the manager and reaper with a hand-advanced clock instead
//! of wall time.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Supplies the current time in the configured office zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Build a fixed offset from whole hours east of UTC.
///
/// Returns `None` when the offset is out of chrono's accepted range
/// (beyond +/- 23:59:59).
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
}

/// Wall-clock time shifted into a fixed office zone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    /// UTC+7, the zone of the original deployment.
    fn default() -> Self {
        Self {
            offset: offset_from_hours(7).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock that only moves when told to. Intended for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(at("2025-06-02T09:00:00+07:00"));
        assert_eq!(clock.now(), at("2025-06-02T09:00:00+07:00"));

        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), at("2025-06-02T09:10:00+07:00"));

        clock.set(at("2025-06-03T00:01:00+07:00"));
        assert_eq!(clock.now().date_naive().to_string(), "2025-06-03");
    }

    #[test]
    fn system_clock_uses_offset() {
        let clock = SystemClock::new(offset_from_hours(7).unwrap());
        let now = clock.now();
        assert_eq!(now.offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn offset_rejects_out_of_range_hours() {
        assert!(offset_from_hours(7).is_some());
        assert!(offset_from_hours(-11).is_some());
        assert!(offset_from_hours(30).is_none());
    }
}
