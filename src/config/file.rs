//! # Project Config File
//!
//! `envsync.yaml`: the tracked secret-name schema and the configured targets.
//! Values never live here, only names.
//!
//! ```yaml
//! version: 2
//! secrets: [API_KEY, STRIPE_KEY]
//! targets:
//!   web:
//!     type: vercel
//!     project: prj_123
//!     mapping: { development: test, preview: test, production: live }
//!     exclude: ["*_TEST"]
//! ```

use crate::constants::CURRENT_CONFIG_VERSION;
use crate::error::ConfigError;
use crate::model::{EnvironmentMapping, PlatformConfig, SecretFilter, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

fn current_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

/// One target entry as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDef {
    /// `type` plus the platform-specific fields
    #[serde(flatten)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub mapping: EnvironmentMapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl TargetDef {
    #[must_use]
    pub fn to_target(&self, name: &str) -> Target {
        Target {
            name: name.to_string(),
            config: self.platform.clone(),
            mapping: self.mapping.clone(),
            filter: SecretFilter {
                include: self.include.clone(),
                exclude: self.exclude.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetDef>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFile {
    /// Empty config at the current version
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            secrets: Vec::new(),
            targets: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Parse config content; `path` is only used in error messages
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: ConfigFile =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.version == 0 {
            config.version = CURRENT_CONFIG_VERSION;
        }
        if config.version > CURRENT_CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_yaml(&content, path)?;
        debug!(
            path = %path.display(),
            secrets = config.secrets.len(),
            targets = config.targets.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Write the config, creating parent directories as needed
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        tokio::fs::write(path, content).await.map_err(write_error)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    #[must_use]
    pub fn has_secret(&self, name: &str) -> bool {
        self.secrets.iter().any(|s| s == name)
    }

    /// Add a name to the schema. Returns `false` when it was already tracked.
    pub fn add_secret(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.has_secret(&name) {
            return false;
        }
        self.secrets.push(name);
        true
    }

    /// Add or replace a target. Without an explicit mapping the platform's
    /// default mapping is used.
    pub fn add_target(
        &mut self,
        name: impl Into<String>,
        platform: PlatformConfig,
        mapping: Option<EnvironmentMapping>,
    ) {
        let mapping = mapping.unwrap_or_else(|| platform.platform().default_mapping());
        self.targets.insert(
            name.into(),
            TargetDef {
                platform,
                mapping,
                include: Vec::new(),
                exclude: Vec::new(),
            },
        );
    }

    /// Every configured target, in name order
    #[must_use]
    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|(name, def)| def.to_target(name))
            .collect()
    }

    pub fn target(&self, name: &str) -> Result<Target, ConfigError> {
        self.targets
            .get(name)
            .map(|def| def.to_target(name))
            .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))
    }
}
