//! # Errors
//!
//! Typed errors for the sync engine. Structural, configuration and credential
//! problems are hard stops for the unit of work they block. Per-secret write
//! failures are [`SecretWriteError`] values collected into a result.

use crate::auth::AuthStatus;
use crate::provider::Platform;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Capability a platform lacks when an operation is rejected up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Values cannot be read back (pull is blocked)
    WriteOnly,
    /// No writer is available for this store
    ReadOnly,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::WriteOnly => f.write_str("write-only"),
            Capability::ReadOnly => f.write_str("read-only"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials not found for {platform}{}", env_hint(.env_var))]
    NotFound {
        platform: Platform,
        env_var: Option<&'static str>,
    },
}

fn env_hint(env_var: &Option<&'static str>) -> String {
    env_var
        .map(|var| format!(" (set {var} or add a token to the target config)"))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("unsupported config version {found} (this build understands up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("unknown target '{0}'")]
    UnknownTarget(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid configuration for target '{target}': {message}")]
    Configuration { target: String, message: String },

    #[error("authentication failed for {target}: {source}")]
    Credentials {
        target: String,
        #[source]
        source: CredentialError,
    },

    #[error("authentication failed for {} target(s): {}", .failures.len(), failed_names(.failures))]
    Authentication { failures: Vec<AuthStatus> },

    #[error("failed to list secrets from {target}: {source}")]
    RemoteRead {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{target} uses {platform}, which is {capability}: cannot {operation}")]
    Unsupported {
        target: String,
        platform: Platform,
        capability: Capability,
        operation: &'static str,
    },
}

fn failed_names(failures: &[AuthStatus]) -> String {
    failures
        .iter()
        .map(|f| f.target_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SyncError {
    /// True for errors rejected before any network call because of a platform capability
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SyncError::Unsupported { .. })
    }
}

/// A single secret that failed to write; recorded in the result, never propagated
#[derive(Debug, Error)]
#[error("{name}: {source}")]
pub struct SecretWriteError {
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}
