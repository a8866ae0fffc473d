//! Runtime configuration for the category tree core.
//!
//! # Responsibility
//! - Describe where the tree database lives and how long writers may wait
//!   for the tree lock.
//! - Carry logging bootstrap settings for embedding binaries.
//!
//! # Example
//!
//! ```
//! use nestcat_core::CoreConfig;
//!
//! let config = CoreConfig::from_json_str(r#"{ "busy_timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.busy_timeout_ms, 250);
//! assert!(config.db_path.is_none());
//! ```

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default wait for a competing writer before a transaction gives up.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub const ENV_DB_PATH: &str = "NESTCAT_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "NESTCAT_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "NESTCAT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NESTCAT_LOG_DIR";

/// Core configuration.
///
/// All fields have defaults; an empty JSON object is a valid config that
/// selects an in-memory database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    /// SQLite database file. `None` selects an in-memory database.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Upper bound for waiting on the writer lock, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Log level passed to `init_logging`.
    #[serde(default = "default_level_string")]
    pub log_level: String,

    /// Absolute log directory. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_level_string(),
            log_dir: None,
        }
    }
}

/// Error raised while reading configuration input.
#[derive(Debug)]
pub enum ConfigError {
    /// JSON input is malformed or has wrongly typed fields.
    Json(serde_json::Error),
    /// Environment variable holds a value that cannot be parsed.
    InvalidEnv { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::InvalidEnv { key, value } => {
                write!(f, "invalid value `{value}` for environment variable {key}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidEnv { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl CoreConfig {
    /// Parses config from a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Builds config from `NESTCAT_*` environment variables.
    ///
    /// Blank values are treated as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    /// Busy timeout as a `Duration`.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_level_string() -> String {
    default_log_level().to_string()
}
