//! Run clock: the single "now" every generator measures time against.
//!
//! Captured once per run so that every timestamp in a run is relative
//! to the same instant, and so tests can pin it.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Value;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Days subtracted per month offset when bucketing usage by month.
/// Drifts from true calendar months over long windows.
pub const DAYS_PER_MONTH_OFFSET: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedClock {
    pub now: NaiveDateTime,
}

/// A (year, month) bucket plus the date it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub date: NaiveDateTime,
}

impl SeedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Wall-clock now, second precision.
    pub fn system() -> Self {
        let now = Local::now().naive_local();
        Self::new(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Fixed clock for tests: 2026-10-19 12:00:00.
    pub fn fixed_test() -> Self {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        Self::new(now)
    }

    pub fn days_ago(&self, days: i64) -> NaiveDateTime {
        self.now - Duration::days(days)
    }

    /// Same time of day on the first of the current month.
    pub fn month_anchor(&self) -> NaiveDateTime {
        self.now.with_day(1).unwrap_or(self.now)
    }

    /// Bucket for `offset` months back: anchor minus 30 days per offset.
    pub fn bucket(&self, offset: u32) -> MonthBucket {
        let date = self.month_anchor() - Duration::days(DAYS_PER_MONTH_OFFSET * offset as i64);
        MonthBucket {
            year: date.year(),
            month: date.month(),
            date,
        }
    }
}

/// Render a timestamp the way every table stores it.
pub fn timestamp_value(ts: &NaiveDateTime) -> Value {
    Value::Text(ts.format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_current_month() {
        let clock = SeedClock::fixed_test();
        let b = clock.bucket(0);
        assert_eq!((b.year, b.month), (2026, 10));
        assert_eq!(b.date.day(), 1);
    }

    #[test]
    fn thirty_day_steps_drift_from_calendar_months() {
        // Mar 1 minus 30 days lands in January in a non-leap year,
        // so February is skipped entirely.
        let now = NaiveDate::from_ymd_opt(2025, 3, 15)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        let clock = SeedClock::new(now);
        let b = clock.bucket(1);
        assert_eq!((b.year, b.month, b.date.day()), (2025, 1, 30));
    }

    #[test]
    fn timestamps_render_without_fraction() {
        let clock = SeedClock::fixed_test();
        assert_eq!(
            timestamp_value(&clock.now),
            Value::Text("2026-10-19 12:00:00".into())
        );
    }
}
