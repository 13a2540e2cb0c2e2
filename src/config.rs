//! Reader configuration
//!
//! Configuration is immutable once loaded. It comes from, in order of
//! precedence:
//!
//! 1. Environment variables (`SSTABLE_*`)
//! 2. A JSON document passed to [`ReaderConfig::from_json`]
//! 3. Built-in defaults
//!
//! The process-wide configuration is read from the environment once and
//! cached; individual reads may override it through `ChecksummedRead`.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Abort the process instead of returning fatal internal errors
pub const ENV_ABORT_ON_INTERNAL_ERROR: &str = "SSTABLE_ABORT_ON_INTERNAL_ERROR";
/// Default read buffer size for file streams, in bytes
pub const ENV_READ_BUFFER_SIZE: &str = "SSTABLE_READ_BUFFER_SIZE";
/// Minimum severity written by the logger
pub const ENV_LOG_LEVEL: &str = "SSTABLE_LOG_LEVEL";

/// Default read buffer size: 8 KiB
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

static GLOBAL: OnceLock<ReaderConfig> = OnceLock::new();

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid buffer size: {0} (must be non-zero)")]
    InvalidBufferSize(usize),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every checksummed reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Abort the process on internal invariant violations.
    ///
    /// Off by default: the violation is logged at FATAL and returned as a
    /// fatal [`ReaderError`](crate::sstable::ReaderError).
    pub abort_on_internal_error: bool,
    /// Default `StreamOptions::buffer_size`.
    pub buffer_size: usize,
    /// Minimum severity the logger writes.
    ///
    /// The logger is process-wide: this takes effect through
    /// [`ReaderConfig::global`] or [`ReaderConfig::apply_log_level`], never
    /// from a config passed to a single read.
    pub log_level: Severity,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            abort_on_internal_error: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            log_level: Severity::Warn,
        }
    }
}

impl ReaderConfig {
    /// Parses a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from defaults plus environment overrides.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Applies `SSTABLE_*` overrides looked up through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ABORT_ON_INTERNAL_ERROR) {
            self.abort_on_internal_error = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_ABORT_ON_INTERNAL_ERROR,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_READ_BUFFER_SIZE) {
            self.buffer_size = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_READ_BUFFER_SIZE,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Severity::parse(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_LOG_LEVEL,
                value,
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Rejects values no reader can work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }

    /// Makes `log_level` the logger's minimum severity for the whole process.
    pub fn apply_log_level(&self) {
        Logger::set_min_severity(self.log_level);
    }

    /// Process-wide configuration, loaded from the environment on first use.
    ///
    /// An invalid environment is reported once and replaced by defaults.
    pub fn global() -> &'static ReaderConfig {
        GLOBAL.get_or_init(|| {
            let config = match Self::from_env() {
                Ok(config) => config,
                Err(e) => {
                    let error = e.to_string();
                    log_event_with_fields(Event::ConfigInvalid, &[("error", error.as_str())]);
                    Self::default()
                }
            };
            config.apply_log_level();
            config
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
