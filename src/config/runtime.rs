//! # Runtime Settings
//!
//! Process-level settings loaded from environment variables, read once at startup.

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL,
};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Runtime configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// `ENVSYNC_LOG_LEVEL`: level for this crate's logs when `RUST_LOG` is unset
    pub log_level: String,
    /// `ENVSYNC_LOG_FORMAT`: `text` or `json`
    pub log_format: LogFormat,
    /// `ENVSYNC_HTTP_TIMEOUT_SECS`: per-request timeout for platform APIs
    pub http_timeout_secs: u64,
    /// `ENVSYNC_CONFIG`: project config file path
    pub config_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::parse(DEFAULT_LOG_FORMAT),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Self {
            log_level: vars.str_or("ENVSYNC_LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: LogFormat::parse(&vars.str_or("ENVSYNC_LOG_FORMAT", DEFAULT_LOG_FORMAT)),
            http_timeout_secs: vars
                .parsed_or("ENVSYNC_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
                .max(1),
            config_path: PathBuf::from(vars.str_or("ENVSYNC_CONFIG", DEFAULT_CONFIG_FILE)),
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Read variable or return default value
    fn parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        (self.0)(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Read variable as string or return default; blank counts as unset
    fn str_or(&self, key: &str, default: &str) -> String {
        (self.0)(key)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}
