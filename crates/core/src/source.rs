//! Boundary to the remote address book.

use crate::contact::ContactRecord;
use crate::error::FetchError;

/// vCard property holding the birthday.
pub const BIRTHDAY_FIELD: &str = "BDAY";

/// Anything that can list contacts together with one of their fields.
#[async_trait::async_trait]
pub trait ContactSource: Send + Sync {
    /// Fetch every contact, attaching the raw value of `field` when present.
    ///
    /// A failure anywhere fails the whole listing.
    async fn list_contacts_with_field(&self, field: &str)
        -> Result<Vec<ContactRecord>, FetchError>;

    /// Human-readable name for logs (e.g., `"carddav"`).
    fn source_name(&self) -> &str;
}
