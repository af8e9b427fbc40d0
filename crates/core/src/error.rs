use thiserror::Error;

/// A birthday value that none of the known layouts could make sense of.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no format defined for {0:?}")]
    NoMatchingFormat(String),
}

/// Fatal configuration problems, only raised during startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fetching contacts from the remote address book failed.
///
/// Transports wrap their own error type; the scheduler only needs to log it
/// and keep the previous roster.
#[derive(Error, Debug)]
#[error("fetching contacts: {source}")]
pub struct FetchError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl FetchError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
