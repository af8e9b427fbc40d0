//! Pushover notifier.

use std::sync::Arc;
use std::time::Duration;

use birthday_core::{BirthDate, Contact, Settings};

use crate::settings::{require, resolve, warn_unknown_keys};
use crate::templating::TemplateRenderer;
use crate::traits::{Notifier, NotifyError};

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Upper bound for one API call.
pub const PUSHOVER_TIMEOUT: Duration = Duration::from_secs(2);

const KNOWN_KEYS: &[&str] = &["apiToken", "userKey", "sound", "apiURL"];

/// Sends reminders through the Pushover messages API.
///
/// Settings: `apiToken` (required, env `PUSHOVER_API_TOKEN`), `userKey`
/// (required, `PUSHOVER_USER_KEY`), `sound` (`PUSHOVER_SOUND`) and
/// `apiURL` to point at a compatible gateway.
#[derive(Debug)]
pub struct PushoverNotifier {
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(PUSHOVER_TIMEOUT)
            .build()?;
        Ok(Self { renderer, client })
    }
}

struct Credentials {
    token: String,
    user: String,
    sound: Option<String>,
    api_url: String,
}

fn credentials(settings: &Settings) -> Result<Credentials, NotifyError> {
    let api_url = match resolve(settings, "apiURL", "PUSHOVER_API_URL")? {
        Some(url) => {
            reqwest::Url::parse(&url)
                .map_err(|e| NotifyError::Settings(format!("apiURL is not a valid URL: {e}")))?;
            url
        }
        None => PUSHOVER_API_URL.to_string(),
    };

    Ok(Credentials {
        token: require(settings, "apiToken", "PUSHOVER_API_TOKEN")?,
        user: require(settings, "userKey", "PUSHOVER_USER_KEY")?,
        sound: resolve(settings, "sound", "PUSHOVER_SOUND")?,
        api_url,
    })
}

#[async_trait::async_trait]
impl Notifier for PushoverNotifier {
    fn validate_settings(&self, settings: &Settings) -> Result<(), NotifyError> {
        credentials(settings)?;
        warn_unknown_keys(self.channel_name(), settings, KNOWN_KEYS);
        Ok(())
    }

    async fn send_notification(
        &self,
        settings: &Settings,
        contact: &Contact,
        when: BirthDate,
    ) -> Result<(), NotifyError> {
        let creds = credentials(settings)?;
        let message = self.renderer.render_body(contact, when)?;
        let title = self.renderer.render_title(contact);

        let mut form = vec![
            ("token", creds.token.as_str()),
            ("user", creds.user.as_str()),
            ("message", message.as_str()),
            ("title", title.as_str()),
        ];
        if let Some(sound) = creds.sound.as_deref() {
            form.push(("sound", sound));
        }

        let response = self
            .client
            .post(&creds.api_url)
            .form(&form)
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

        tracing::debug!(%status, title = %title, "pushover notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "pushover"
    }
}
