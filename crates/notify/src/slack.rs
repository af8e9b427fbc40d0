//! Slack incoming-webhook notifier.

use std::sync::Arc;
use std::time::Duration;

use birthday_core::{BirthDate, Contact, Settings};
use serde::Serialize;

use crate::settings::{require, resolve, warn_unknown_keys};
use crate::templating::TemplateRenderer;
use crate::traits::{Notifier, NotifyError};

/// Upper bound for one webhook call.
pub const SLACK_TIMEOUT: Duration = Duration::from_secs(2);

const KNOWN_KEYS: &[&str] = &["webhook", "channel", "iconEmoji", "username"];

/// Body of an incoming-webhook POST.
#[derive(Debug, Serialize, PartialEq)]
pub struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Posts the rendered body to a Slack incoming webhook.
///
/// Settings: `webhook` (required, env `SLACK_WEBHOOK`), `channel`
/// (`SLACK_CHANNEL`), `iconEmoji` (`SLACK_ICON_EMOJI`), `username`
/// (`SLACK_USERNAME`).
#[derive(Debug)]
pub struct SlackNotifier {
    renderer: Arc<TemplateRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(SLACK_TIMEOUT).build()?;
        Ok(Self { renderer, client })
    }

    fn payload(&self, settings: &Settings, text: String) -> Result<SlackPayload, NotifyError> {
        Ok(SlackPayload {
            channel: resolve(settings, "channel", "SLACK_CHANNEL")?,
            icon_emoji: resolve(settings, "iconEmoji", "SLACK_ICON_EMOJI")?,
            text,
            username: resolve(settings, "username", "SLACK_USERNAME")?,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn validate_settings(&self, settings: &Settings) -> Result<(), NotifyError> {
        let webhook = require(settings, "webhook", "SLACK_WEBHOOK")?;
        reqwest::Url::parse(&webhook)
            .map_err(|e| NotifyError::Settings(format!("webhook is not a valid URL: {e}")))?;
        self.payload(settings, String::new())?;
        warn_unknown_keys(self.channel_name(), settings, KNOWN_KEYS);
        Ok(())
    }

    async fn send_notification(
        &self,
        settings: &Settings,
        contact: &Contact,
        when: BirthDate,
    ) -> Result<(), NotifyError> {
        let webhook = require(settings, "webhook", "SLACK_WEBHOOK")?;
        let text = self.renderer.render_body(contact, when)?;
        let payload = self.payload(settings, text)?;

        // The webhook URL is the credential; keep it out of the error.
        let response = self
            .client
            .post(&webhook)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Status {
                channel: self.channel_name().to_string(),
                status,
                body,
            });
        }

        tracing::debug!(%status, channel = ?payload.channel, "slack notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "slack"
    }
}
