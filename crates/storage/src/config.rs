#![forbid(unsafe_code)]

use serde::Deserialize;
use std::time::Duration;

pub const ENV_WRITE_RETRIES: &str = "MEMOGRAPH_WRITE_RETRIES";
pub const ENV_SQLITE_BUSY_TIMEOUT_MS: &str = "MEMOGRAPH_SQLITE_BUSY_TIMEOUT_MS";

const DEFAULT_WRITE_RETRIES: u32 = 8;
const DEFAULT_SQLITE_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_WRITE_RETRIES: u32 = 64;
const MAX_SQLITE_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Tunables of the engine and its sqlite store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Extra attempts after a write loses the pointer race. Zero surfaces the
    /// first conflict.
    pub max_write_retries: u32,
    pub sqlite_busy_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_write_retries: DEFAULT_WRITE_RETRIES,
            sqlite_busy_timeout_ms: DEFAULT_SQLITE_BUSY_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through `lookup`. Values are trimmed; empty ones are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        let mut config = Self::default();
        if let Some((key, value)) = read(ENV_WRITE_RETRIES) {
            config.max_write_retries = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })?;
        }
        if let Some((key, value)) = read(ENV_SQLITE_BUSY_TIMEOUT_MS) {
            config.sqlite_busy_timeout_ms = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })?;
        }
        Ok(config.clamped())
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        Ok(config.clamped())
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self.clamped()
    }

    pub fn sqlite_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.sqlite_busy_timeout_ms)
    }

    fn clamped(self) -> Self {
        Self {
            max_write_retries: self.max_write_retries.min(MAX_WRITE_RETRIES),
            sqlite_busy_timeout_ms: self.sqlite_busy_timeout_ms.min(MAX_SQLITE_BUSY_TIMEOUT_MS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: {value:?}"),
            Self::Yaml(err) => write!(f, "yaml: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Yaml(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}
