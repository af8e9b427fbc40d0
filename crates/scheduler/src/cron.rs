//! Cron normalization and next-fire helpers for the dispatch timer.

use std::str::FromStr;
use std::time::Duration;

use ::cron::Schedule;
use chrono::{DateTime, TimeZone};

use crate::error::SchedulerError;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// User YAML uses standard 5-field cron: `min hour day-of-month month day-of-week`.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
pub fn parse_cron(expr: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(&normalize_cron(expr)).map_err(|source| SchedulerError::Cron {
        expr: expr.to_string(),
        source,
    })
}

/// First fire time strictly after `now`, in `now`'s zone.
pub fn next_fire<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(now).next()
}

/// How long to sleep from `now` until the next fire time.
///
/// `None` when the schedule never fires again.
pub fn until_next_fire<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<Duration> {
    let next = next_fire(schedule, now)?;
    Some((next - now.clone()).to_std().unwrap_or(Duration::ZERO))
}
