//! Birthday roster and the two timers driving it.
//!
//! This crate provides:
//! - `Roster`, the swap-on-refresh set of parsed birthdays
//! - `AdvanceOffsets`, the reminder days (always including the day itself)
//! - Cron helpers for the daily dispatch schedule
//! - `BirthdayScheduler`, which refreshes from a `ContactSource` and hands
//!   matching reminders to the dispatcher

pub mod cron;
pub mod error;
pub mod offsets;
pub mod roster;
pub mod scheduler;

pub use error::SchedulerError;
pub use offsets::AdvanceOffsets;
pub use roster::{build_roster, BirthdayEntry, Roster};
pub use scheduler::{BirthdayScheduler, DispatchSummary, Match, SchedulerOptions};
