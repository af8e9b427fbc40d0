//! Notifier that writes reminders to the application log.

use std::sync::Arc;

use birthday_core::{BirthDate, Contact, Settings};

use crate::settings::warn_unknown_keys;
use crate::templating::TemplateRenderer;
use crate::traits::{Notifier, NotifyError};

/// Emits the rendered body as an `info` line. Takes no settings.
#[derive(Debug)]
pub struct LogNotifier {
    renderer: Arc<TemplateRenderer>,
}

impl LogNotifier {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn validate_settings(&self, settings: &Settings) -> Result<(), NotifyError> {
        warn_unknown_keys(self.channel_name(), settings, &[]);
        Ok(())
    }

    async fn send_notification(
        &self,
        _settings: &Settings,
        contact: &Contact,
        when: BirthDate,
    ) -> Result<(), NotifyError> {
        if !contact.has_any_name() {
            return Err(NotifyError::MissingName);
        }

        let body = self.renderer.render_body(contact, when)?;
        tracing::info!(
            name = contact.given_name.as_deref(),
            title = %self.renderer.render_title(contact),
            "{body}"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
