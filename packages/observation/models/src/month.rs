//! Calendar-month arithmetic on first-of-month [`NaiveDate`] keys.
//!
//! Every month key in the system is the first day of its month, so month
//! identity is plain date equality.

use chrono::{Datelike as _, NaiveDate};

/// Returns the first day of `date`'s month.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shifts a month key by `delta` months (negative moves backwards).
///
/// The result is always a first-of-month date. Saturates at the chrono
/// date range rather than panicking.
#[must_use]
pub fn add_months(month: NaiveDate, delta: i32) -> NaiveDate {
    let index = month_index(month) + i64::from(delta);
    from_month_index(index).unwrap_or(month)
}

/// Number of whole months from `from` to `to` (negative when `to` is
/// earlier).
#[must_use]
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    month_index(to) - month_index(from)
}

/// Every month key from `start` through `end`, inclusive and ascending.
///
/// Empty when `start` is after `end`.
#[must_use]
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let start = month_start(start);
    let end = month_start(end);
    let count = months_between(start, end);
    if count < 0 {
        return Vec::new();
    }
    (0..=count)
        .filter_map(|offset| from_month_index(month_index(start) + offset))
        .collect()
}

/// The `count` months ending at (and including) `end`'s month.
#[must_use]
pub fn trailing_months(end: NaiveDate, count: u32) -> Vec<NaiveDate> {
    if count == 0 {
        return Vec::new();
    }
    let end = month_start(end);
    let back = i32::try_from(count - 1).unwrap_or(i32::MAX);
    month_range(add_months(end, -back), end)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn from_month_index(index: i64) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month0 = u32::try_from(index.rem_euclid(12)).ok()?;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}
