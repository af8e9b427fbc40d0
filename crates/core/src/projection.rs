//! Year-agnostic projection of birthdays onto the calendar.
//!
//! All functions take `today` explicitly so a dispatch pass can compute it
//! once and evaluate every contact against the same day.

use chrono::{Datelike, Days, NaiveDate};

use crate::date::BirthDate;

/// Earliest occurrence of `birth`'s month/day on or after `today`.
///
/// Always lands in `today`'s year or the following one.
pub fn project_next(birth: BirthDate, today: NaiveDate) -> NaiveDate {
    birth
        .on_year(today.year())
        .filter(|candidate| *candidate >= today)
        .or_else(|| birth.on_year(today.year() + 1))
        .unwrap_or(NaiveDate::MAX)
}

/// Whether the next occurrence of `birth` is `today`.
pub fn is_today(birth: BirthDate, today: NaiveDate) -> bool {
    project_next(birth, today) == today
}

/// Age reached on the next occurrence.
///
/// Meaningless when the year is unknown; callers check
/// [`BirthDate::has_year`] before showing it.
pub fn age(birth: BirthDate, today: NaiveDate) -> i32 {
    project_next(birth, today).year() - birth.year()
}

/// The day a reminder `days_in_advance` before `next` is due.
pub fn notify_date(next: NaiveDate, days_in_advance: u32) -> NaiveDate {
    next.checked_sub_days(Days::new(u64::from(days_in_advance)))
        .unwrap_or(NaiveDate::MIN)
}
