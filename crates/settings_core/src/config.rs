//! Runtime configuration for hosts embedding the settings core.
//!
//! # Responsibility
//! - Collect storage, cache and logging knobs in one value.
//! - Read overrides from `SETTINGS_*` environment variables.
//!
//! # Invariants
//! - `CoreConfig::default()` is always usable: in-memory store, cache on.
//! - Invalid environment values are reported, never silently ignored.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SETTINGS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SETTINGS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SETTINGS_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SETTINGS_BUSY_TIMEOUT_MS";
pub const ENV_CACHE: &str = "SETTINGS_CACHE";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration errors from environment parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { var: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, value } => {
                write!(f, "invalid value `{value}` for environment variable {var}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Settings core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file path; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` skips file logging.
    pub log_dir: Option<PathBuf>,
    /// SQLite busy timeout applied on connection open.
    pub busy_timeout: Duration,
    /// When `false`, hosts should wire a `NoopCache`.
    pub cache_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            cache_enabled: true,
        }
    }
}

impl CoreConfig {
    /// Builds a config from process environment on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = non_empty(lookup(ENV_LOG_LEVEL)) {
            config.log_level = level;
        }
        if let Some(dir) = non_empty(lookup(ENV_LOG_DIR)) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = non_empty(lookup(ENV_BUSY_TIMEOUT_MS)) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = non_empty(lookup(ENV_CACHE)) {
            config.cache_enabled = parse_switch(&raw).ok_or(ConfigError::InvalidValue {
                var: ENV_CACHE,
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
