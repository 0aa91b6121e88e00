//! # Provider Modules
//!
//! Secret stores for the supported platforms.
//!
//! Every platform implements [`SecretStore`] for reads and metadata, and hands
//! out a [`SecretWriter`] for mutations. Handles are created per command by a
//! [`StoreFactory`]; the production factory is [`PlatformRegistry`].
//!
//! A handle may keep an owned cache of the remote key/value list between calls.
//! All store methods take `&mut self`, so one handle has one caller at a time.

use crate::model::{EnvironmentMapping, LocalEnvironment};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// Common utilities shared across HTTP providers
pub mod common;

mod registry;

// Provider implementations
pub mod aws;
pub mod convex;
pub mod dotenv;
pub mod flyio;
pub mod netlify;
pub mod railway;
pub mod render;
pub mod vercel;

pub use registry::{PlatformRegistry, StoreFactory};

/// Supported platform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Dotenv,
    Vercel,
    Convex,
    Flyio,
    Railway,
    Netlify,
    Render,
    AwsSecretsManager,
}

/// Static metadata for a platform type, independent of any configured instance
#[derive(Debug, Clone, Copy)]
pub struct PlatformInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Environment variable consulted first for the credential
    pub env_var: Option<&'static str>,
    /// Credentials come from the platform SDK's own chain, never a token
    pub sdk_auth: bool,
    /// Reads return names but never values
    pub write_only: bool,
    pub environments: &'static [&'static str],
    pub default_mapping: &'static [(&'static str, LocalEnvironment)],
}

const DOTENV_INFO: PlatformInfo = PlatformInfo {
    id: "dotenv",
    display_name: "Local .env",
    env_var: None,
    sdk_auth: false,
    write_only: false,
    environments: &["local"],
    default_mapping: &[("local", LocalEnvironment::Test)],
};

const VERCEL_INFO: PlatformInfo = PlatformInfo {
    id: "vercel",
    display_name: "Vercel",
    env_var: Some("VERCEL_TOKEN"),
    sdk_auth: false,
    write_only: false,
    environments: &["development", "preview", "production"],
    default_mapping: &[
        ("development", LocalEnvironment::Test),
        ("preview", LocalEnvironment::Test),
        ("production", LocalEnvironment::Live),
    ],
};

const CONVEX_INFO: PlatformInfo = PlatformInfo {
    id: "convex",
    display_name: "Convex",
    env_var: Some("CONVEX_DEPLOY_KEY"),
    sdk_auth: false,
    write_only: false,
    environments: &["default"],
    default_mapping: &[("default", LocalEnvironment::Test)],
};

const FLYIO_INFO: PlatformInfo = PlatformInfo {
    id: "flyio",
    display_name: "Fly.io",
    env_var: Some("FLY_API_TOKEN"),
    sdk_auth: false,
    write_only: true,
    environments: &["default"],
    default_mapping: &[("default", LocalEnvironment::Test)],
};

const RAILWAY_INFO: PlatformInfo = PlatformInfo {
    id: "railway",
    display_name: "Railway",
    env_var: Some("RAILWAY_TOKEN"),
    sdk_auth: false,
    write_only: false,
    environments: &["production", "staging"],
    default_mapping: &[
        ("production", LocalEnvironment::Live),
        ("staging", LocalEnvironment::Test),
    ],
};

const NETLIFY_INFO: PlatformInfo = PlatformInfo {
    id: "netlify",
    display_name: "Netlify",
    env_var: Some("NETLIFY_TOKEN"),
    sdk_auth: false,
    write_only: false,
    environments: &["production", "deploy-preview", "branch-deploy", "dev"],
    default_mapping: &[
        ("production", LocalEnvironment::Live),
        ("deploy-preview", LocalEnvironment::Test),
        ("branch-deploy", LocalEnvironment::Test),
        ("dev", LocalEnvironment::Test),
    ],
};

const RENDER_INFO: PlatformInfo = PlatformInfo {
    id: "render",
    display_name: "Render",
    env_var: Some("RENDER_API_KEY"),
    sdk_auth: false,
    write_only: false,
    environments: &["default"],
    default_mapping: &[("default", LocalEnvironment::Test)],
};

const AWS_SECRETS_MANAGER_INFO: PlatformInfo = PlatformInfo {
    id: "aws-secretsmanager",
    display_name: "AWS Secrets Manager",
    env_var: None,
    sdk_auth: true,
    write_only: false,
    environments: &["default"],
    default_mapping: &[("default", LocalEnvironment::Test)],
};

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Dotenv,
        Platform::Vercel,
        Platform::Convex,
        Platform::Flyio,
        Platform::Railway,
        Platform::Netlify,
        Platform::Render,
        Platform::AwsSecretsManager,
    ];

    #[must_use]
    pub fn info(&self) -> &'static PlatformInfo {
        match self {
            Platform::Dotenv => &DOTENV_INFO,
            Platform::Vercel => &VERCEL_INFO,
            Platform::Convex => &CONVEX_INFO,
            Platform::Flyio => &FLYIO_INFO,
            Platform::Railway => &RAILWAY_INFO,
            Platform::Netlify => &NETLIFY_INFO,
            Platform::Render => &RENDER_INFO,
            Platform::AwsSecretsManager => &AWS_SECRETS_MANAGER_INFO,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.info().id
    }

    #[must_use]
    pub fn is_write_only(&self) -> bool {
        self.info().write_only
    }

    /// True when no credential of any kind is involved (local files)
    #[must_use]
    pub fn is_credential_free(&self) -> bool {
        let info = self.info();
        info.env_var.is_none() && !info.sdk_auth
    }

    /// True when the platform SDK resolves credentials itself
    #[must_use]
    pub fn uses_sdk_auth(&self) -> bool {
        self.info().sdk_auth
    }

    #[must_use]
    pub fn default_mapping(&self) -> EnvironmentMapping {
        self.info()
            .default_mapping
            .iter()
            .map(|(remote, local)| (*remote, *local))
            .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Platform::ALL.iter().map(Platform::as_str).collect();
                format!("unknown platform '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// A remote entry as reported by a list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteValue {
    /// The platform returned the current value (possibly empty)
    Value(String),
    /// The platform confirmed the name exists but withheld the value
    Redacted,
}

impl RemoteValue {
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            RemoteValue::Value(v) => Some(v),
            RemoteValue::Redacted => None,
        }
    }
}

/// Remote secrets for one environment, keyed by name
pub type RemoteSecrets = BTreeMap<String, RemoteValue>;

/// Read side of a platform store
#[async_trait]
pub trait SecretStore: Send {
    fn platform(&self) -> Platform;

    fn is_write_only(&self) -> bool {
        self.platform().is_write_only()
    }

    fn supported_environments(&self) -> Vec<String> {
        self.platform()
            .info()
            .environments
            .iter()
            .map(|e| (*e).to_string())
            .collect()
    }

    fn default_mapping(&self) -> EnvironmentMapping {
        self.platform().default_mapping()
    }

    /// Credential and configuration sanity check against the platform
    async fn validate(&mut self) -> Result<()>;

    /// List every secret visible in `environment`
    async fn list(&mut self, environment: &str) -> Result<RemoteSecrets>;

    /// Write access, or `None` for stores that cannot be written
    fn writer(&mut self) -> Option<&mut dyn SecretWriter>;
}

/// Write side of a platform store
#[async_trait]
pub trait SecretWriter: Send {
    /// Create or overwrite a secret in `environment`
    async fn set(&mut self, name: &str, value: &str, environment: &str) -> Result<()>;

    /// Remove a secret from `environment`; removing an absent secret is not an error
    async fn delete(&mut self, name: &str, environment: &str) -> Result<()>;
}
