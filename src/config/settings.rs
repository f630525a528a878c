use super::ConfigError;
use crate::actions::catalog::find_action_def;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CALLBACK_TIMEOUT_MS: &str = "ULYSSES_BRIDGE_CALLBACK_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "ULYSSES_BRIDGE_POLL_INTERVAL_MS";
pub const ENV_OPENER: &str = "ULYSSES_BRIDGE_OPENER";
pub const ENV_ACCESS_TOKEN: &str = "ULYSSES_BRIDGE_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub app_scheme: String,
    pub callback_scheme: String,
    pub opener: String,
    pub timeouts: Timeouts,
    pub rate_limit: RateLimitConfig,
    pub receiver: ReceiverConfig,
    pub store: StoreConfig,
    pub disabled_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_scheme: "ulysses".to_string(),
            callback_scheme: "ulysses-bridge".to_string(),
            opener: default_opener().to_string(),
            timeouts: Timeouts::default(),
            rate_limit: RateLimitConfig::default(),
            receiver: ReceiverConfig::default(),
            store: StoreConfig::default(),
            disabled_actions: Vec::new(),
            access_token: None,
        }
    }
}

fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    pub callback_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub open_timeout_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            callback_timeout_ms: 30_000,
            poll_interval_ms: 100,
            open_timeout_ms: 10_000,
        }
    }
}

impl Timeouts {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_destructive_calls: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_destructive_calls: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub start_attempts: u32,
    pub start_interval_ms: u64,
    /// Program launched as the receiver. Unset means this executable's
    /// `__receiver` verb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            start_attempts: 20,
            start_interval_ms: 250,
            program: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3_600,
            sweep_interval_secs: 300,
        }
    }
}

impl StoreConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Settings {
    /// Parses `path`; a missing file yields defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CALLBACK_TIMEOUT_MS) {
            self.timeouts.callback_timeout_ms = parse_env_u64(ENV_CALLBACK_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.timeouts.poll_interval_ms = parse_env_u64(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OPENER).filter(|v| !v.trim().is_empty()) {
            self.opener = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.access_token = Some(raw.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_scheme("app_scheme", &self.app_scheme)?;
        validate_scheme("callback_scheme", &self.callback_scheme)?;
        if self.app_scheme == self.callback_scheme {
            return Err(ConfigError::Settings(
                "callback_scheme must differ from app_scheme".to_string(),
            ));
        }
        if self.opener.trim().is_empty() {
            return Err(ConfigError::Settings("opener must be non-empty".to_string()));
        }

        let positive = [
            ("timeouts.callback_timeout_ms", self.timeouts.callback_timeout_ms),
            ("timeouts.poll_interval_ms", self.timeouts.poll_interval_ms),
            ("timeouts.open_timeout_ms", self.timeouts.open_timeout_ms),
            ("rate_limit.window_ms", self.rate_limit.window_ms),
            (
                "rate_limit.max_destructive_calls",
                u64::from(self.rate_limit.max_destructive_calls),
            ),
            ("receiver.start_attempts", u64::from(self.receiver.start_attempts)),
            ("receiver.start_interval_ms", self.receiver.start_interval_ms),
            ("store.retention_secs", self.store.retention_secs),
            ("store.sweep_interval_secs", self.store.sweep_interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Settings(format!("{name} must be > 0")));
            }
        }
        if self.timeouts.poll_interval_ms > self.timeouts.callback_timeout_ms {
            return Err(ConfigError::Settings(
                "timeouts.poll_interval_ms must not exceed timeouts.callback_timeout_ms"
                    .to_string(),
            ));
        }

        for name in &self.disabled_actions {
            if find_action_def(name).is_none() {
                return Err(ConfigError::Settings(format!(
                    "disabled_actions contains unknown action `{name}`"
                )));
            }
        }
        Ok(())
    }
}

fn validate_scheme(field: &str, scheme: &str) -> Result<(), ConfigError> {
    let valid = scheme
        .chars()
        .next()
        .map(|first| first.is_ascii_lowercase())
        .unwrap_or(false)
        && scheme.chars().all(|ch| {
            ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '+' || ch == '.' || ch == '-'
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Settings(format!(
            "{field} `{scheme}` must start with a lowercase letter and use only [a-z0-9+.-]"
        )))
    }
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::EnvOverride {
            name: name.to_string(),
            value: raw.to_string(),
        })
}
