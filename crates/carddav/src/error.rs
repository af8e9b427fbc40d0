//! Errors raised while talking to the address book server.

use birthday_core::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum CardDavError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("vCard decode error: {0}")]
    Vcard(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<CardDavError> for FetchError {
    fn from(err: CardDavError) -> Self {
        FetchError::new(err)
    }
}
