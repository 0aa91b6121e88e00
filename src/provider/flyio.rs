//! # Fly.io
//!
//! App secrets through the Fly.io Machines API. The API lists secret names and
//! digests but never values, so every listed entry is [`RemoteValue::Redacted`].

use crate::model::FlyioConfig;
use crate::provider::common::{decode_json, endpoint, ensure_success};
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.machines.dev/v1";

#[derive(Debug, Deserialize)]
struct Secret {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    secrets: Vec<Secret>,
}

/// Store handle for one Fly.io app
pub struct FlyioStore {
    http: Client,
    base_url: String,
    token: String,
    app_name: String,
}

impl std::fmt::Debug for FlyioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlyioStore")
            .field("app_name", &self.app_name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FlyioStore {
    #[must_use]
    pub fn new(http: Client, token: String, config: &FlyioConfig) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            app_name: config.app_name.clone(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = endpoint(&self.base_url, segments)?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }
}

#[async_trait]
impl SecretStore for FlyioStore {
    fn platform(&self) -> Platform {
        Platform::Flyio
    }

    async fn validate(&mut self) -> Result<()> {
        self.list("default").await.map(|_| ())
    }

    async fn list(&mut self, _environment: &str) -> Result<RemoteSecrets> {
        let response = self
            .request(Method::GET, &["apps", &self.app_name, "secrets"])?
            .send()
            .await
            .context("Failed to list Fly.io secrets")?;
        let list: ListResponse = decode_json(response, Platform::Flyio).await?;
        debug!(app = %self.app_name, count = list.secrets.len(), "Fetched Fly.io secret names");
        Ok(list
            .secrets
            .into_iter()
            .map(|s| (s.name, RemoteValue::Redacted))
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for FlyioStore {
    async fn set(&mut self, name: &str, value: &str, _environment: &str) -> Result<()> {
        info!(secret = name, app = %self.app_name, "Setting Fly.io secret");
        let response = self
            .request(Method::POST, &["apps", &self.app_name, "secrets"])?
            .json(&json!({ "values": { name: value } }))
            .send()
            .await
            .context("Failed to set Fly.io secret")?;
        ensure_success(response, Platform::Flyio).await?;
        Ok(())
    }

    async fn delete(&mut self, name: &str, _environment: &str) -> Result<()> {
        info!(secret = name, app = %self.app_name, "Deleting Fly.io secret");
        let response = self
            .request(Method::DELETE, &["apps", &self.app_name, "secrets", name])?
            .send()
            .await
            .context("Failed to delete Fly.io secret")?;
        ensure_success(response, Platform::Flyio).await?;
        Ok(())
    }
}
