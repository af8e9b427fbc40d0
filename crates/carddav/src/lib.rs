//! CardDAV contact source.
//!
//! This crate provides:
//! - `CardDavClient`, a basic-auth CardDAV client implementing `ContactSource`
//! - Multistatus (RFC 4918) response parsing
//! - A small vCard (RFC 6350) content-line decoder

pub mod client;
pub mod error;
pub mod multistatus;
pub mod vcard;

pub use client::CardDavClient;
pub use error::CardDavError;
