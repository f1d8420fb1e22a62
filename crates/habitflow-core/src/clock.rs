//! Injected time source.
//!
//! All core components read "now" through the [`Clock`] trait rather than
//! calling `Utc::now()` ad hoc, so tests control time and day boundaries
//! deterministically. Calendar days are UTC days (`NaiveDate`), stored as
//! `YYYY-MM-DD` text.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

/// Supplies the current instant and the current calendar day.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// The calendar day containing `now()`.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time source used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Pin the clock to midnight UTC of the given day.
    pub fn at_day(day: NaiveDate) -> Self {
        Self::new(day.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut guard = self.now.lock().expect("clock lock");
        *guard += chrono::Duration::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (*self).now()
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let clock = FixedClock::at_day(day);
        assert_eq!(clock.today(), day);

        clock.advance_secs(60 * 60 * 25);
        assert_eq!(clock.today(), day.succ_opt().unwrap());
    }

    #[test]
    fn today_is_derived_from_now() {
        let now = Utc::now();
        let clock = FixedClock::new(now);
        assert_eq!(clock.today(), now.date_naive());
    }
}
