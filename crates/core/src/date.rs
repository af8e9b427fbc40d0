//! Normalized birth dates, possibly without a known year.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A birthday as stored on a contact.
///
/// `year` is [`BirthDate::NO_YEAR`] when the source omitted the birth year.
/// Month and day are always valid; for year-less dates the day is checked
/// against a leap year so `--0229` survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BirthDate {
    year: i32,
    month: u32,
    day: u32,
}

impl BirthDate {
    /// Sentinel meaning "birth year unknown".
    pub const NO_YEAR: i32 = 1;

    /// Returns `None` when month/day do not form a real calendar day.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        // Year 4 is a leap year in the proleptic Gregorian calendar.
        let check_year = if year == Self::NO_YEAR { 4 } else { year };
        NaiveDate::from_ymd_opt(check_year, month, day)?;
        Some(Self { year, month, day })
    }

    pub fn without_year(month: u32, day: u32) -> Option<Self> {
        Self::new(Self::NO_YEAR, month, day)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn has_year(&self) -> bool {
        self.year != Self::NO_YEAR
    }

    /// Place this birthday into `year`.
    ///
    /// Feb 29 in a common year rolls over to Mar 1.
    pub fn on_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day).or_else(|| {
            NaiveDate::from_ymd_opt(year, self.month, 1)?
                .checked_add_days(Days::new(u64::from(self.day - 1)))
        })
    }
}

impl From<NaiveDate> for BirthDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for BirthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_year() {
            write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
        } else {
            write!(f, "--{:02}-{:02}", self.month, self.day)
        }
    }
}

/// How much of a date the source value actually carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// Output of the parser: the date plus which components were present.
///
/// Missing month/day default to 1, matching how the layouts are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub date: BirthDate,
    pub precision: DatePrecision,
}

impl ParsedDate {
    /// The date, if it is precise enough to schedule a yearly reminder.
    pub fn birth_date(&self) -> Option<BirthDate> {
        (self.precision == DatePrecision::Day).then_some(self.date)
    }
}
