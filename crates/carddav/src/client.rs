//! Basic-auth CardDAV client.
//!
//! Discovery follows RFC 6352: the principal's `addressbook-home-set` is
//! looked up with `PROPFIND`, the home set is listed with `Depth: 1` to find
//! address book collections, and each book is queried with an
//! `addressbook-query` `REPORT` returning the full vCards.

use std::fmt;

use birthday_core::{ContactRecord, ContactSource, FetchError, WebdavConfig};
use reqwest::{Method, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::error::CardDavError;
use crate::multistatus::{parse_multistatus, DavResponse};
use crate::vcard::{self, Card};

const HOME_SET_PROPFIND: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop><card:addressbook-home-set/></d:prop>
</d:propfind>"#;

const BOOKS_PROPFIND: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop><d:resourcetype/><d:displayname/></d:prop>
</d:propfind>"#;

const ADDRESSBOOK_QUERY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<card:addressbook-query xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop><d:getetag/><card:address-data/></d:prop>
</card:addressbook-query>"#;

/// Talks to one CardDAV server as one user.
pub struct CardDavClient {
    client: reqwest::Client,
    base_url: Url,
    user: String,
    pass: String,
    principal: String,
}

impl CardDavClient {
    /// Build a client from the `webdav` config section.
    ///
    /// The request timeout is applied to every call.
    pub fn new(config: &WebdavConfig) -> Result<Self, CardDavError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // `join` replaces the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
            pass: config.pass.clone(),
            principal: config.principal_path(),
        })
    }

    /// Resolve the principal's address book home set.
    pub async fn find_address_book_home_set(&self) -> Result<Url, CardDavError> {
        let principal = self.base_url.join(&self.principal)?;
        let responses = self
            .request("PROPFIND", &principal, "0", HOME_SET_PROPFIND)
            .await?;

        let href = responses
            .iter()
            .flat_map(|r| r.home_set.iter())
            .next()
            .ok_or_else(|| {
                CardDavError::Protocol(format!("no addressbook-home-set for {principal}"))
            })?;

        Ok(principal.join(href)?)
    }

    /// List the address book collections below `home_set`.
    pub async fn find_address_books(&self, home_set: &Url) -> Result<Vec<Url>, CardDavError> {
        let responses = self.request("PROPFIND", home_set, "1", BOOKS_PROPFIND).await?;

        responses
            .iter()
            .filter(|r| r.is_address_book())
            .map(|r| home_set.join(&r.href).map_err(CardDavError::from))
            .collect()
    }

    /// Fetch and decode every vCard in one address book.
    pub async fn query_address_book(&self, book: &Url) -> Result<Vec<Card>, CardDavError> {
        let responses = self.request("REPORT", book, "1", ADDRESSBOOK_QUERY).await?;

        let mut cards = Vec::new();
        for response in responses {
            let Some(data) = response.address_data else {
                continue;
            };
            cards.extend(vcard::decode(&data)?);
        }
        Ok(cards)
    }

    /// Walk all address books and collect contacts with the requested field.
    pub async fn fetch_contacts(&self, field: &str) -> Result<Vec<ContactRecord>, CardDavError> {
        let home_set = self.find_address_book_home_set().await?;
        let books = self.find_address_books(&home_set).await?;
        debug!(home_set = %home_set, books = books.len(), "discovered address books");

        let mut records = Vec::new();
        for book in &books {
            let cards = self.query_address_book(book).await?;
            debug!(book = %book, cards = cards.len(), "queried address book");
            records.extend(cards.iter().map(|card| card.to_record(field)));
        }

        info!(
            contacts = records.len(),
            with_field = records.iter().filter(|r| r.birthday.is_some()).count(),
            field,
            "fetched contacts"
        );
        Ok(records)
    }

    async fn request(
        &self,
        method: &str,
        url: &Url,
        depth: &str,
        body: &'static str,
    ) -> Result<Vec<DavResponse>, CardDavError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| CardDavError::Protocol(format!("invalid method {method}")))?;

        let response = self
            .client
            .request(method, url.clone())
            .basic_auth(&self.user, Some(&self.pass))
            .header("Depth", depth)
            .header(reqwest::header::CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::MULTI_STATUS {
            return Err(CardDavError::Status {
                url: url.to_string(),
                status,
            });
        }

        parse_multistatus(&response.text().await?)
    }
}

impl fmt::Debug for CardDavClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDavClient")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user)
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ContactSource for CardDavClient {
    async fn list_contacts_with_field(
        &self,
        field: &str,
    ) -> Result<Vec<ContactRecord>, FetchError> {
        Ok(self.fetch_contacts(field).await?)
    }

    fn source_name(&self) -> &str {
        "carddav"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(base_url: &str) -> WebdavConfig {
        WebdavConfig {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
            user: "alice".into(),
            pass: "s3cret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn principal_is_resolved_against_base() {
        let client = CardDavClient::new(&config("https://cloud.example.com/remote.php/dav/")).unwrap();
        let principal = client.base_url.join(&client.principal).unwrap();
        assert_eq!(
            principal.as_str(),
            "https://cloud.example.com/remote.php/dav/principals/users/alice"
        );
    }

    #[test]
    fn base_without_trailing_slash_keeps_last_segment() {
        let client = CardDavClient::new(&config("https://cloud.example.com/remote.php/dav")).unwrap();
        let principal = client.base_url.join(&client.principal).unwrap();
        assert_eq!(
            principal.as_str(),
            "https://cloud.example.com/remote.php/dav/principals/users/alice"
        );
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            CardDavClient::new(&config("not a url")),
            Err(CardDavError::Url(_))
        ));
    }

    #[test]
    fn debug_hides_password() {
        let client = CardDavClient::new(&config("https://dav.example.com/")).unwrap();
        let dbg = format!("{client:?}");
        assert!(dbg.contains("alice"));
        assert!(!dbg.contains("s3cret"));
    }

    #[test]
    fn source_name_is_carddav() {
        let client = CardDavClient::new(&config("https://dav.example.com/")).unwrap();
        assert_eq!(client.source_name(), "carddav");
    }
}
