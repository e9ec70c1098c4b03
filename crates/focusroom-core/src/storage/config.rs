//! TOML-based application configuration.
//!
//! Stores:
//! - API endpoint, credential and request timeout
//! - Interval and meditation session defaults
//! - Notification preference
//! - Sync retry policy and reward polling cadence
//!
//! Configuration is stored at `~/.config/focusroom/config.toml`. Every
//! option has a default, so a partial or missing file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::session::{
    IntervalConfig, MeditationConfig, RuntimeOptions, SessionDefaults, SyncPolicy,
};

/// Environment variable that overrides `api.token`.
pub const TOKEN_ENV: &str = "FOCUSROOM_TOKEN";

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Automatic reward polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Polling stops once the session has been quiet this long.
    #[serde(default = "default_recent_activity_secs")]
    pub recent_activity_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusroom/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub interval: IntervalConfig,
    #[serde(default)]
    pub meditation: MeditationConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub sync: SyncPolicy,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_secs() -> u64 {
    5 * 60
}
fn default_recent_activity_secs() -> u64 {
    15 * 60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            recent_activity_secs: default_recent_activity_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            interval: IntervalConfig::default(),
            meditation: MeditationConfig::default(),
            notifications: NotificationsConfig::default(),
            sync: SyncPolicy::default(),
            rewards: RewardsConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        if key.is_empty() {
            return Err(unknown());
        }

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Known keys that may be absent from the serialized form.
    fn optional_key(key: &str) -> bool {
        key == "api.token"
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// A file that parses but holds unusable values is a load error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let failed = |message: String| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message,
                };
                let cfg: Config = toml::from_str(&content).map_err(|e| failed(e.to_string()))?;
                cfg.validate().map_err(|e| failed(e.to_string()))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None if Self::optional_key(key) => Some(String::new()),
            None => None,
        }
    }

    /// Set a value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the resulting configuration is invalid. `self` is left unchanged
    /// on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        if Self::optional_key(key) {
            if let Some(api) = json.get_mut("api").and_then(|v| v.as_object_mut()) {
                api.entry("token")
                    .or_insert_with(|| serde_json::Value::String(String::new()));
            }
        }
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut next: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        if next.api.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            next.api.token = None;
        }
        next.validate().map_err(|e| match e {
            ConfigError::InvalidValue { message, .. } => invalid(message),
            other => other,
        })?;
        *self = next;
        Ok(())
    }

    /// Flattened `key = value` pairs in file order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            flatten("", &json, &mut out);
        }
        out
    }

    /// Check every section for values the engine cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        url::Url::parse(&self.api.base_url)
            .map_err(|e| invalid("api.base_url", e.to_string()))?;
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than zero".into()));
        }
        self.interval
            .validate()
            .map_err(|e| invalid("interval", e.to_string()))?;
        self.meditation
            .validate()
            .map_err(|e| invalid("meditation", e.to_string()))?;
        if self.rewards.poll_interval_secs == 0 {
            return Err(invalid(
                "rewards.poll_interval_secs",
                "must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Bearer token, preferring the FOCUSROOM_TOKEN environment variable.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api.token.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            interval: self.interval.clone(),
            meditation: self.meditation.clone(),
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            reward_poll_interval: Duration::from_secs(self.rewards.poll_interval_secs),
            recent_activity: Duration::from_secs(self.rewards.recent_activity_secs),
        }
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
