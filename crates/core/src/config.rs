//! YAML configuration file with environment overrides.
//!
//! Loaded once at startup. Every problem found here is fatal: the process
//! must not start timers with a half-valid configuration.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Principal layout used by Nextcloud; `%s` is replaced by the user name.
pub const WEBDAV_PRINCIPAL_NEXTCLOUD: &str = "principals/users/%s";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Extra reminder days before the birthday. The day itself is always included.
    #[serde(default)]
    pub notify_days_in_advance: Vec<u32>,

    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,

    /// Minijinja body template; the renderer's default when unset.
    #[serde(default)]
    pub template: Option<String>,

    /// 5- or 6-field cron expression in local time.
    #[serde(default = "default_dispatch_schedule")]
    pub dispatch_schedule: String,

    /// Upper bound for deliveries running at the same time.
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent_deliveries: usize,

    #[serde(default)]
    pub webdav: WebdavConfig,
}

fn default_dispatch_schedule() -> String {
    "0 0 * * *".into()
}

fn default_max_concurrent_deliveries() -> usize {
    8
}

impl Config {
    /// Read, override from env, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML only. No env overrides, no validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_opt);
    }

    /// Apply overrides using an arbitrary lookup (the environment in production).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WEBDAV_BASE_URL") {
            self.webdav.base_url = v;
        }
        if let Some(v) = lookup("WEBDAV_USER") {
            self.webdav.user = v;
        }
        if let Some(v) = lookup("WEBDAV_PASS") {
            self.webdav.pass = v;
        }
        if let Some(v) = lookup("NOTIFICATION_TEMPLATE") {
            self.template = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webdav.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("webdav.baseURL is required".into()));
        }
        url::Url::parse(&self.webdav.base_url).map_err(|e| {
            ConfigError::Invalid(format!("webdav.baseURL {:?}: {e}", self.webdav.base_url))
        })?;
        if self.webdav.fetch_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "webdav.fetchInterval must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_deliveries == 0 {
            return Err(ConfigError::Invalid(
                "maxConcurrentDeliveries must be at least 1".into(),
            ));
        }
        for (i, notifier) in self.notifiers.iter().enumerate() {
            if notifier.kind.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("notifiers[{i}].type is required")));
            }
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  webdav:    url={}, user={}, interval={}s",
            self.webdav.base_url,
            self.webdav.user,
            self.webdav.fetch_interval.as_secs()
        );
        tracing::info!(
            "  schedule:  cron={:?}, advance={:?}",
            self.dispatch_schedule,
            self.notify_days_in_advance
        );
        let kinds: Vec<&str> = self.notifiers.iter().map(|n| n.kind.as_str()).collect();
        tracing::info!("  notifiers: {:?}", kinds);
    }
}

// ── Notifiers ─────────────────────────────────────────────────

/// One configured delivery channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    /// Registry discriminator (`log`, `pushover`, `slack`).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub settings: Settings,
}

/// Opaque per-notifier settings bag.
///
/// Usually holds secrets, so `Debug` only prints the keys.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, serde_yaml::Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0
            .insert(key.into(), serde_yaml::Value::String(value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Scalar value rendered as a string. Sequences and maps yield `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            serde_yaml::Value::Null => Some(String::new()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── WebDAV ────────────────────────────────────────────────────

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebdavConfig {
    #[serde(rename = "baseURL", default)]
    pub base_url: String,

    #[serde(default = "default_fetch_interval", deserialize_with = "deserialize_duration")]
    pub fetch_interval: Duration,

    /// Per-request timeout for the address book server.
    #[serde(default = "default_fetch_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub pass: String,

    #[serde(default = "default_principal")]
    pub principal: String,
}

fn default_fetch_interval() -> Duration {
    Duration::from_secs(3_600)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_principal() -> String {
    WEBDAV_PRINCIPAL_NEXTCLOUD.into()
}

impl Default for WebdavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            fetch_interval: default_fetch_interval(),
            timeout: default_fetch_timeout(),
            user: String::new(),
            pass: String::new(),
            principal: default_principal(),
        }
    }
}

impl WebdavConfig {
    /// Principal path with the user substituted.
    pub fn principal_path(&self) -> String {
        self.principal.replace("%s", &self.user)
    }
}

impl fmt::Debug for WebdavConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebdavConfig")
            .field("base_url", &self.base_url)
            .field("fetch_interval", &self.fetch_interval)
            .field("timeout", &self.timeout)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("principal", &self.principal)
            .finish()
    }
}

// ── Durations ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Secs(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationRepr::deserialize(deserializer)? {
        DurationRepr::Secs(secs) => Ok(Duration::from_secs(secs)),
        DurationRepr::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {text:?}"))),
    }
}

/// Seconds per duration unit suffix.
fn unit_secs(unit: char) -> Option<u64> {
    match unit {
        'd' => Some(86_400),
        'h' => Some(3_600),
        'm' => Some(60),
        's' => Some(1),
        _ => None,
    }
}

/// Parse `fetchInterval`-style durations: `1h`, `15m`, `1d2h`, or bare seconds.
///
/// `None` for empty input, unknown units, digits trailing a unit (`30m15`) and
/// totals that overflow `u64` seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    let mut has_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let n: u64 = digits.parse().ok()?;
        digits.clear();
        total = total.checked_add(n.checked_mul(unit_secs(ch)?)?)?;
        has_unit = true;
    }

    if !digits.is_empty() {
        if has_unit {
            return None;
        }
        total = digits.parse().ok()?;
    }

    Some(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"
notifyDaysInAdvance: [7, 1]
dispatchSchedule: "0 8 * * *"
maxConcurrentDeliveries: 4
template: "{{ contact | display_name }}"
notifiers:
  - type: log
  - type: pushover
    settings:
      apiToken: abc
      userKey: def
      priority: 1
webdav:
  baseURL: https://cloud.example.com/remote.php/dav/
  fetchInterval: 30m
  timeout: 10
  user: alice
  pass: hunter2
"#;

    #[test]
    fn parse_full_yaml() {
        let cfg = Config::from_yaml(FULL).unwrap();
        assert_eq!(cfg.notify_days_in_advance, vec![7, 1]);
        assert_eq!(cfg.dispatch_schedule, "0 8 * * *");
        assert_eq!(cfg.max_concurrent_deliveries, 4);
        assert_eq!(cfg.notifiers.len(), 2);
        assert_eq!(cfg.notifiers[0].kind, "log");
        assert_eq!(cfg.notifiers[1].settings.get("apiToken").as_deref(), Some("abc"));
        assert_eq!(cfg.notifiers[1].settings.get("priority").as_deref(), Some("1"));
        assert_eq!(cfg.webdav.fetch_interval, Duration::from_secs(1_800));
        assert_eq!(cfg.webdav.timeout, Duration::from_secs(10));
        assert_eq!(cfg.webdav.principal_path(), "principals/users/alice");
        cfg.validate().unwrap();
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_yaml("webdav:\n  baseURL: https://dav.example.com/\n").unwrap();
        assert!(cfg.notify_days_in_advance.is_empty());
        assert!(cfg.notifiers.is_empty());
        assert!(cfg.template.is_none());
        assert_eq!(cfg.dispatch_schedule, "0 0 * * *");
        assert_eq!(cfg.max_concurrent_deliveries, 8);
        assert_eq!(cfg.webdav.fetch_interval, Duration::from_secs(3_600));
        assert_eq!(cfg.webdav.principal, WEBDAV_PRINCIPAL_NEXTCLOUD);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_yaml("notifyDaysInAdvanced: [1]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let err = Config::from_yaml("notifiers:\n  - type: log\n    setings: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn negative_advance_days_are_rejected() {
        assert!(Config::from_yaml("notifyDaysInAdvance: [-1]\n").is_err());
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let yaml = "webdav:\n  baseURL: https://x.example/\n  fetchInterval: soon\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn validation_requires_base_url() {
        let cfg = Config::from_yaml("notifiers: []\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("baseURL"));

        let cfg = Config::from_yaml("webdav:\n  baseURL: not a url\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_interval_and_concurrency() {
        let cfg =
            Config::from_yaml("webdav:\n  baseURL: https://x.example/\n  fetchInterval: 0s\n")
                .unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config::from_yaml(
            "maxConcurrentDeliveries: 0\nwebdav:\n  baseURL: https://x.example/\n",
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config::from_yaml(FULL).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("WEBDAV_USER", "bob"),
            ("NOTIFICATION_TEMPLATE", "Hi {{ contact | display_name }}"),
        ]);
        cfg.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.webdav.user, "bob");
        assert_eq!(cfg.webdav.pass, "hunter2");
        assert_eq!(cfg.template.as_deref(), Some("Hi {{ contact | display_name }}"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.notifiers.len(), 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = Config::from_yaml(FULL).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("abc"));
        assert!(dbg.contains("apiToken"));
    }

    #[test]
    fn example_config_parses() {
        let cfg = Config::from_yaml(include_str!("../../../config.example.yaml")).unwrap();
        assert_eq!(cfg.notifiers.len(), 2);
        assert_eq!(cfg.notifiers[1].settings.get("webhook").as_deref(), Some("${SLACK_WEBHOOK}"));
        cfg.validate().unwrap();
    }

    #[test]
    fn parse_duration_components() {
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3_600)));
        assert_eq!(parse_duration("2h30m"), Some(Duration::from_secs(9_000)));
        assert_eq!(parse_duration("1d12h"), Some(Duration::from_secs(129_600)));
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("30m15"), None);
        assert_eq!(parse_duration("1w"), None);
    }

    #[test]
    fn parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("999999999999999999d"), None);
        assert_eq!(parse_duration("18446744073709551615s1s"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
        assert!(Config::from_yaml("webdav:\n  fetchInterval: 999999999999999999d\n").is_err());
    }
}
