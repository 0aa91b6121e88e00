//! # Constants
//!
//! Shared constants used throughout envsync.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default project config file name
pub const DEFAULT_CONFIG_FILE: &str = "envsync.yaml";

/// Config file format version written by this release
pub const CURRENT_CONFIG_VERSION: u32 = 2;

/// Default HTTP request timeout for platform APIs (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default log level when neither `RUST_LOG` nor `ENVSYNC_LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Default log format (`text` or `json`)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Reverse-mapping fallback key in a target's environment mapping
pub const DEFAULT_MAPPING_KEY: &str = "default";

/// Default file used by the dotenv store when no path is configured
pub const DEFAULT_DOTENV_PATH: &str = ".env";
