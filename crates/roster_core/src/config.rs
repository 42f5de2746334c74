//! Runtime configuration.
//!
//! # Responsibility
//! - Describe store, paging and logging settings in one serde-loadable shape.
//! - Reject settings that would make later calls fail in confusing ways.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid configuration.

use crate::logging::normalize_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 20;
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Settings for backing-store calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Per-call wait for a busy database before the attempt fails.
    pub call_timeout_ms: u64,
    /// Attempts per call, first one included.
    pub max_attempts: u32,
    /// Base sleep between attempts; attempt `n` waits `n * backoff`.
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl StoreConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// File logging settings; see `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterConfig {
    /// SQLite file; `None` selects the in-memory store.
    pub database_path: Option<PathBuf>,
    pub store: StoreConfig,
    pub default_page_size: usize,
    pub log: Option<LogConfig>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            store: StoreConfig::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            log: None,
        }
    }
}

impl RosterConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "store.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        if let Some(log) = &self.log {
            normalize_level(&log.level).map_err(ConfigError::Invalid)?;
            if !log.dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log.dir must be an absolute path, got `{}`",
                    log.dir.display()
                )));
            }
        }
        Ok(())
    }
}
