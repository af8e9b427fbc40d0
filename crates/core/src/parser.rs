//! Tolerant parser for vCard `BDAY` values.
//!
//! Address book servers disagree on how birthdays are encoded. Some send the
//! RFC 6350 basic format, some the extended ISO format, some omit the year the
//! RFC way (`--MMDD`) and Apple clients substitute a fake year and flag it with
//! `X-APPLE-OMIT-YEAR`. [`parse`] normalizes all of them into a [`ParsedDate`].
//!
//! Layouts are tried in a fixed order and must consume the whole value; the
//! first full match wins.

use std::borrow::Cow;

use crate::contact::RawBirthdayField;
use crate::date::{BirthDate, DatePrecision, ParsedDate};
use crate::error::ParseError;

/// Parameter Apple uses to flag a fabricated birth year.
pub const OMIT_YEAR_PARAM: &str = "X-APPLE-OMIT-YEAR";

/// Replacement for the fabricated year, parses as [`BirthDate::NO_YEAR`].
const NO_YEAR_MARKER: &str = "0001";

#[derive(Debug, Clone, Copy)]
enum Token {
    Year4,
    Year2,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Lit(&'static str),
}

#[derive(Debug)]
struct Layout {
    tokens: &'static [Token],
    precision: DatePrecision,
}

use Token::*;

/// Priority order. The compact basic format is by far the most common.
const LAYOUTS: &[Layout] = &[
    // 20060102
    Layout { tokens: &[Year4, Month, Day], precision: DatePrecision::Day },
    // 2006-01-02, not RFC conform but sent by Apple
    Layout { tokens: &[Year4, Lit("-"), Month, Lit("-"), Day], precision: DatePrecision::Day },
    // 060102
    Layout { tokens: &[Year2, Month, Day], precision: DatePrecision::Day },
    // --0102, RFC omit-year
    Layout { tokens: &[Lit("--"), Month, Day], precision: DatePrecision::Day },
    // 2006-01
    Layout { tokens: &[Year4, Lit("-"), Month], precision: DatePrecision::Month },
    // 2006
    Layout { tokens: &[Year4], precision: DatePrecision::Year },
    // 20060102T150405
    Layout {
        tokens: &[Year4, Month, Day, Lit("T"), Hour, Minute, Second],
        precision: DatePrecision::Day,
    },
    // 20060102T1504
    Layout { tokens: &[Year4, Month, Day, Lit("T"), Hour, Minute], precision: DatePrecision::Day },
    // 20060102T15
    Layout { tokens: &[Year4, Month, Day, Lit("T"), Hour], precision: DatePrecision::Day },
];

/// Parse a raw birthday field, applying the omit-year quirk first.
///
/// The error carries the original value for diagnostics.
pub fn parse(raw: &RawBirthdayField) -> Result<ParsedDate, ParseError> {
    let value = match raw.param(OMIT_YEAR_PARAM).filter(|p| !p.is_empty()) {
        Some(placeholder) => Cow::Owned(raw.value.replacen(placeholder, NO_YEAR_MARKER, 1)),
        None => Cow::Borrowed(raw.value.as_str()),
    };

    parse_value(&value).ok_or_else(|| ParseError::NoMatchingFormat(raw.value.clone()))
}

/// Parse a bare value without looking at any parameters.
pub fn parse_value(value: &str) -> Option<ParsedDate> {
    LAYOUTS.iter().find_map(|layout| layout.parse(value))
}

impl Layout {
    fn parse(&self, value: &str) -> Option<ParsedDate> {
        let mut rest = value;
        let (mut year, mut month, mut day) = (BirthDate::NO_YEAR, 1, 1);

        for token in self.tokens {
            match *token {
                Lit(lit) => rest = rest.strip_prefix(lit)?,
                Year4 => year = take_digits(&mut rest, 4)? as i32,
                Year2 => {
                    let yy = take_digits(&mut rest, 2)? as i32;
                    year = if yy >= 69 { 1900 + yy } else { 2000 + yy };
                }
                Month => month = take_digits(&mut rest, 2)?,
                Day => day = take_digits(&mut rest, 2)?,
                Hour => bounded(take_digits(&mut rest, 2)?, 23)?,
                Minute | Second => bounded(take_digits(&mut rest, 2)?, 59)?,
            }
        }

        if !rest.is_empty() {
            return None;
        }

        BirthDate::new(year, month, day).map(|date| ParsedDate {
            date,
            precision: self.precision,
        })
    }
}

/// Consume exactly `width` ASCII digits.
fn take_digits(rest: &mut &str, width: usize) -> Option<u32> {
    let digits = rest.get(..width)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    *rest = &rest[width..];
    digits.parse().ok()
}

fn bounded(value: u32, max: u32) -> Option<()> {
    (value <= max).then_some(())
}
