//! Notifier trait definition and shared error types.

use birthday_core::{BirthDate, Contact, Settings};

/// Errors that can occur while validating or delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} returned {status}: {body}")]
    Status {
        channel: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("contact has no name to notify about")]
    MissingName,

    #[error("unknown notifier type {0:?}")]
    UnknownNotifier(String),
}

/// Trait for notification channel implementations.
///
/// Settings are passed on every call rather than stored, so a notifier value
/// never holds credentials.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Check that `settings` carry everything `send_notification` needs.
    ///
    /// Called once at startup; must not touch the network.
    fn validate_settings(&self, settings: &Settings) -> Result<(), NotifyError>;

    /// Render and deliver one reminder for `contact`, whose birthday is `when`.
    ///
    /// Exactly one delivery attempt is made.
    async fn send_notification(
        &self,
        settings: &Settings,
        contact: &Contact,
        when: BirthDate,
    ) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "slack", "log").
    fn channel_name(&self) -> &str;
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub channel: String,
    /// Display name of the contact the reminder was about.
    pub contact: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
