//! Injectable time source for the calendar strategies.
//!
//! Strategies never read the wall clock directly; the compiler hands them a
//! `&dyn Clock` so tests can pin "today" to a fixed date.

use chrono::{NaiveDate, Utc};

/// Source of the current date.
pub trait Clock: Send + Sync {
    /// The current date, in UTC.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to a fixed date. Exported (not test-gated) so downstream
/// crates can drive the calendar strategies deterministically.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_its_date() {
        let date = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }

    #[test]
    fn system_clock_is_not_in_the_past() {
        let lower = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(SystemClock.today() > lower);
    }
}
