//! # Convex
//!
//! Deployment environment variables through the Convex deployment HTTP API.
//! Convex has no environment concept inside a deployment, so the environment
//! argument is accepted and ignored.

use crate::model::ConvexConfig;
use crate::provider::common::{decode_json, ensure_success, join_url};
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const LIST_QUERY_PATH: &str = "_system/cli/queryEnvironmentVariables";

#[derive(Debug, Deserialize)]
struct EnvVar {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    value: Vec<EnvVar>,
}

/// Deployment URL for a deployment name (`https://<name>.convex.cloud`)
#[must_use]
pub fn deployment_url(deployment: &str) -> String {
    format!("https://{deployment}.convex.cloud")
}

/// Store handle for one Convex deployment
pub struct ConvexStore {
    http: Client,
    base_url: String,
    deploy_key: String,
    deployment: String,
}

impl std::fmt::Debug for ConvexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvexStore")
            .field("deployment", &self.deployment)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ConvexStore {
    #[must_use]
    pub fn new(http: Client, deploy_key: String, config: &ConvexConfig) -> Self {
        Self {
            http,
            base_url: deployment_url(&config.deployment),
            deploy_key,
            deployment: config.deployment.clone(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(join_url(&self.base_url, path))
            .header("Authorization", format!("Convex {}", self.deploy_key))
    }

    async fn update(&self, change: serde_json::Value) -> Result<()> {
        let response = self
            .post("/api/update_environment_variables")
            .json(&json!({ "changes": [change] }))
            .send()
            .await
            .context("Failed to update Convex environment variables")?;
        ensure_success(response, Platform::Convex).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for ConvexStore {
    fn platform(&self) -> Platform {
        Platform::Convex
    }

    async fn validate(&mut self) -> Result<()> {
        self.list("default").await.map(|_| ())
    }

    async fn list(&mut self, _environment: &str) -> Result<RemoteSecrets> {
        let body = json!({
            "path": LIST_QUERY_PATH,
            "args": {},
            "format": "json",
        });
        let response = self
            .post("/api/query")
            .json(&body)
            .send()
            .await
            .context("Failed to query Convex environment variables")?;
        let result: QueryResponse = decode_json(response, Platform::Convex).await?;
        if result.status != "success" {
            anyhow::bail!("convex query failed: status {}", result.status);
        }
        debug!(deployment = %self.deployment, count = result.value.len(), "Fetched Convex env vars");
        Ok(result
            .value
            .into_iter()
            .map(|e| (e.name, RemoteValue::Value(e.value)))
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for ConvexStore {
    async fn set(&mut self, name: &str, value: &str, _environment: &str) -> Result<()> {
        info!(secret = name, deployment = %self.deployment, "Setting Convex env var");
        self.update(json!({ "name": name, "value": value })).await
    }

    async fn delete(&mut self, name: &str, _environment: &str) -> Result<()> {
        info!(secret = name, deployment = %self.deployment, "Deleting Convex env var");
        self.update(json!({ "name": name })).await
    }
}
