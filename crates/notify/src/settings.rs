//! Resolution of notifier settings.
//!
//! A key present in the settings bag wins and may reference environment
//! variables as `${VAR_NAME}`. An absent key falls back to the channel's
//! well-known environment variable.

use std::env;

use birthday_core::Settings;

use crate::traits::NotifyError;

/// Resolve `key`, falling back to `env_key` in the process environment.
///
/// `Ok(None)` means the setting is simply not configured.
pub fn resolve(settings: &Settings, key: &str, env_key: &str) -> Result<Option<String>, NotifyError> {
    resolve_with(settings, key, env_key, |name| env::var(name).ok())
}

/// Like [`resolve`], but the setting must end up with a non-empty value.
pub fn require(settings: &Settings, key: &str, env_key: &str) -> Result<String, NotifyError> {
    require_with(settings, key, env_key, |name| env::var(name).ok())
}

pub fn resolve_with(
    settings: &Settings,
    key: &str,
    env_key: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<String>, NotifyError> {
    if settings.contains_key(key) {
        let raw = settings
            .get(key)
            .ok_or_else(|| NotifyError::Settings(format!("{key} must be a scalar value")))?;
        let value = resolve_env_vars(&raw, &lookup)?;
        if value.trim().is_empty() {
            return Err(NotifyError::Settings(format!("{key} must not be empty")));
        }
        return Ok(Some(value));
    }

    Ok(lookup(env_key).filter(|v| !v.trim().is_empty()))
}

pub fn require_with(
    settings: &Settings,
    key: &str,
    env_key: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, NotifyError> {
    resolve_with(settings, key, env_key, lookup)?
        .ok_or_else(|| NotifyError::Settings(format!("{key} is required (or set {env_key})")))
}

/// Warn about keys a channel does not know. They are ignored otherwise.
pub(crate) fn warn_unknown_keys(channel: &str, settings: &Settings, known: &[&str]) {
    for key in settings.keys().filter(|k| !known.contains(k)) {
        tracing::warn!(channel, key, "ignoring unknown notifier setting");
    }
}

/// Resolve `${VAR_NAME}` patterns in a string.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(
    input: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Settings(
                    "unclosed env var reference".to_string(),
                ));
            }
            let value = lookup(&var_name)
                .ok_or_else(|| NotifyError::Settings(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
