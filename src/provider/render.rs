//! # Render
//!
//! Service environment variables through the Render REST API. A service has
//! a single set of variables, so the environment argument is accepted and
//! ignored.

use crate::model::RenderConfig;
use crate::provider::common::{decode_json, endpoint, ensure_success};
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.render.com/v1";

/// Largest page the list endpoint returns
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct EnvVar {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct EnvVarItem {
    #[serde(rename = "envVar")]
    env_var: EnvVar,
    #[serde(default)]
    cursor: Option<String>,
}

/// Store handle for one Render service
pub struct RenderStore {
    http: Client,
    base_url: String,
    token: String,
    service_id: String,
}

impl std::fmt::Debug for RenderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStore")
            .field("service_id", &self.service_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RenderStore {
    #[must_use]
    pub fn new(http: Client, token: String, config: &RenderConfig) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            service_id: config.service_id.clone(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, key: Option<&str>) -> Result<RequestBuilder> {
        let mut segments = vec!["services", self.service_id.as_str(), "env-vars"];
        segments.extend(key);
        let url = endpoint(&self.base_url, &segments)?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }
}

#[async_trait]
impl SecretStore for RenderStore {
    fn platform(&self) -> Platform {
        Platform::Render
    }

    async fn validate(&mut self) -> Result<()> {
        self.list("default").await.map(|_| ())
    }

    async fn list(&mut self, _environment: &str) -> Result<RemoteSecrets> {
        let mut secrets = RemoteSecrets::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, None)?
                .query(&[("limit", PAGE_SIZE)]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor)]);
            }
            let response = request
                .send()
                .await
                .context("Failed to list Render environment variables")?;
            let page: Vec<EnvVarItem> = decode_json(response, Platform::Render).await?;

            let full_page = page.len() >= PAGE_SIZE;
            cursor = page.last().and_then(|item| item.cursor.clone());
            for item in page {
                secrets.insert(item.env_var.key, RemoteValue::Value(item.env_var.value));
            }
            if !full_page || cursor.is_none() {
                break;
            }
        }
        debug!(service = %self.service_id, count = secrets.len(), "Fetched Render env vars");
        Ok(secrets)
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for RenderStore {
    async fn set(&mut self, name: &str, value: &str, _environment: &str) -> Result<()> {
        info!(secret = name, service = %self.service_id, "Setting Render env var");
        let response = self
            .request(Method::PUT, Some(name))?
            .json(&json!({ "value": value }))
            .send()
            .await
            .context("Failed to set Render environment variable")?;
        ensure_success(response, Platform::Render).await?;
        Ok(())
    }

    async fn delete(&mut self, name: &str, _environment: &str) -> Result<()> {
        info!(secret = name, service = %self.service_id, "Deleting Render env var");
        let response = self
            .request(Method::DELETE, Some(name))?
            .send()
            .await
            .context("Failed to delete Render environment variable")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response, Platform::Render).await?;
        Ok(())
    }
}
