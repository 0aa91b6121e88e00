//! # Local .env Store
//!
//! A local env file used as a sync destination. The environment argument is
//! ignored; the file is the whole store. A missing file lists as empty and is
//! created on the first write.

use crate::model::DotenvConfig;
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use crate::source::dotenv::{parse_env, read_or_empty, remove_from_env_file, upsert_env_file};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DotenvStore {
    path: PathBuf,
}

impl DotenvStore {
    #[must_use]
    pub fn new(config: &DotenvConfig) -> Self {
        let path = config
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(crate::constants::DEFAULT_DOTENV_PATH);
        Self::at(path)
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretStore for DotenvStore {
    fn platform(&self) -> Platform {
        Platform::Dotenv
    }

    async fn validate(&mut self) -> Result<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Cannot access {}", self.path.display())),
        }
    }

    async fn list(&mut self, _environment: &str) -> Result<RemoteSecrets> {
        let content = read_or_empty(&self.path).await?;
        let values = parse_env(&content);
        debug!(path = %self.path.display(), count = values.len(), "Read env file store");
        Ok(values
            .into_iter()
            .map(|(name, value)| (name, RemoteValue::Value(value)))
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for DotenvStore {
    async fn set(&mut self, name: &str, value: &str, _environment: &str) -> Result<()> {
        let update = BTreeMap::from([(name.to_string(), value.to_string())]);
        upsert_env_file(&self.path, &update).await?;
        info!(secret = name, path = %self.path.display(), "Wrote secret to env file");
        Ok(())
    }

    async fn delete(&mut self, name: &str, _environment: &str) -> Result<()> {
        if remove_from_env_file(&self.path, name).await? {
            info!(secret = name, path = %self.path.display(), "Removed secret from env file");
        }
        Ok(())
    }
}
