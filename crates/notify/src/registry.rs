//! Maps configured notifier `type` strings to implementations.

use std::sync::Arc;

use birthday_core::{NotifierConfig, Settings};

use crate::log::LogNotifier;
use crate::pushover::PushoverNotifier;
use crate::slack::SlackNotifier;
use crate::templating::TemplateRenderer;
use crate::traits::{Notifier, NotifyError};

/// Notifier types understood by [`create_notifier`].
pub const NOTIFIER_TYPES: &[&str] = &["log", "pushover", "slack"];

/// Instantiate the notifier registered under `kind`.
pub fn create_notifier(
    kind: &str,
    renderer: Arc<TemplateRenderer>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    let notifier: Arc<dyn Notifier> = match kind {
        "log" => Arc::new(LogNotifier::new(renderer)),
        "pushover" => Arc::new(PushoverNotifier::new(renderer)?),
        "slack" => Arc::new(SlackNotifier::new(renderer)?),
        other => return Err(NotifyError::UnknownNotifier(other.to_string())),
    };
    Ok(notifier)
}

/// One validated channel together with its settings.
#[derive(Clone)]
pub struct ConfiguredNotifier {
    pub notifier: Arc<dyn Notifier>,
    pub settings: Settings,
}

impl std::fmt::Debug for ConfiguredNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredNotifier")
            .field("channel", &self.notifier.channel_name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Every configured channel, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct NotifierRegistry {
    channels: Vec<ConfiguredNotifier>,
}

impl NotifierRegistry {
    /// Build and validate every configured notifier.
    ///
    /// Fails on the first unknown type or invalid settings block; the
    /// error names the offending entry.
    pub fn from_configs(
        configs: &[NotifierConfig],
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let mut registry = Self::default();
        for (i, config) in configs.iter().enumerate() {
            let notifier = create_notifier(&config.kind, renderer.clone())?;
            notifier.validate_settings(&config.settings).map_err(|e| match e {
                NotifyError::Settings(msg) => {
                    NotifyError::Settings(format!("notifiers[{i}] ({}): {msg}", config.kind))
                }
                other => other,
            })?;
            tracing::debug!(index = i, channel = notifier.channel_name(), "notifier configured");
            registry.push(notifier, config.settings.clone());
        }
        Ok(registry)
    }

    /// Add an already validated notifier.
    pub fn push(&mut self, notifier: Arc<dyn Notifier>, settings: Settings) {
        self.channels.push(ConfiguredNotifier { notifier, settings });
    }

    pub fn channels(&self) -> &[ConfiguredNotifier] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
