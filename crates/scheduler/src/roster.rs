//! The in-memory set of known birthdays.

use std::sync::{Mutex, MutexGuard, PoisonError};

use birthday_core::{parser, BirthDate, Contact, ContactRecord, DatePrecision};
use tracing::{debug, warn};

/// One contact with a usable birthday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayEntry {
    pub contact: Contact,
    pub birth: BirthDate,
}

/// Parse fetched records into entries.
///
/// Contacts without the field are skipped silently; unparseable values and
/// dates without a day are skipped with a warning.
pub fn build_roster(records: Vec<ContactRecord>) -> Vec<BirthdayEntry> {
    let mut entries = Vec::with_capacity(records.len());

    for record in records {
        let Some(raw) = record.birthday else {
            continue;
        };
        let name = record.contact.display_name().to_string();

        let parsed = match parser::parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(contact = %name, value = %raw.value, error = %e, "skipping unparseable birthday");
                continue;
            }
        };

        match parsed.birth_date() {
            Some(birth) => {
                debug!(contact = %name, birth = %birth, "birthday added");
                entries.push(BirthdayEntry {
                    contact: record.contact,
                    birth,
                });
            }
            None => warn!(
                contact = %name,
                value = %raw.value,
                precision = precision_name(parsed.precision),
                "skipping birthday without month and day"
            ),
        }
    }

    entries
}

fn precision_name(precision: DatePrecision) -> &'static str {
    match precision {
        DatePrecision::Year => "year",
        DatePrecision::Month => "month",
        DatePrecision::Day => "day",
    }
}

/// Entries behind a single lock, replaced wholesale on refresh.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Mutex<Vec<BirthdayEntry>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BirthdayEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a freshly built set, returning the previous size.
    pub fn replace(&self, entries: Vec<BirthdayEntry>) -> usize {
        let old = std::mem::replace(&mut *self.lock(), entries);
        old.len()
    }

    /// Run `f` against the current entries while holding the lock.
    pub fn with_entries<R>(&self, f: impl FnOnce(&[BirthdayEntry]) -> R) -> R {
        f(&self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
