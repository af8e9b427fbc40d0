//! Core types for the birthday notifier.
//!
//! This crate provides:
//! - `BirthDate` and the tolerant vCard date parser
//! - Next-occurrence projection and age calculation
//! - `Clock` abstraction so "today" can be injected in tests
//! - Contact model and the `ContactSource` trait implemented by transports
//! - YAML configuration loading with environment overrides

pub mod clock;
pub mod config;
pub mod contact;
pub mod date;
pub mod error;
pub mod parser;
pub mod projection;
pub mod source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, NotifierConfig, Settings, WebdavConfig};
pub use contact::{Contact, ContactRecord, RawBirthdayField};
pub use date::{BirthDate, DatePrecision, ParsedDate};
pub use error::*;
pub use source::{ContactSource, BIRTHDAY_FIELD};
