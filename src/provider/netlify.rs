//! # Netlify
//!
//! Environment variables through the Netlify account env API. A variable has
//! one value per deploy context (`production`, `deploy-preview`,
//! `branch-deploy`, `dev`), or a single value for context `all`.
//!
//! Remote environments are deploy contexts. Writes touch only the value for
//! that context; the other contexts keep theirs.

use crate::model::NetlifyConfig;
use crate::provider::common::{decode_json, endpoint, ensure_success};
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.netlify.com/api/v1";

/// Context whose value applies to every deploy context
const ALL_CONTEXTS: &str = "all";

/// Scopes given to variables created by this tool
const DEFAULT_SCOPES: [&str; 4] = ["builds", "functions", "runtime", "post_processing"];

#[derive(Debug, Clone, Deserialize)]
struct EnvVar {
    key: String,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    values: Vec<ContextValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContextValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    value: String,
    context: String,
}

impl EnvVar {
    /// Value for `context`, falling back to an `all` value
    fn value_for(&self, context: &str) -> Option<&str> {
        let find = |wanted: &str| {
            self.values
                .iter()
                .find(|v| v.context == wanted)
                .map(|v| v.value.as_str())
        };
        find(context).or_else(|| find(ALL_CONTEXTS))
    }
}

/// Store handle for one Netlify account, optionally scoped to one site
pub struct NetlifyStore {
    http: Client,
    base_url: String,
    token: String,
    account_id: String,
    site_id: Option<String>,
}

impl std::fmt::Debug for NetlifyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlifyStore")
            .field("account_id", &self.account_id)
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NetlifyStore {
    #[must_use]
    pub fn new(http: Client, token: String, config: &NetlifyConfig) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            account_id: config.account_id.clone(),
            site_id: config.site_id.clone().filter(|s| !s.is_empty()),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request under `accounts/{account_id}/env`, carrying `site_id` when scoped
    fn request(&self, method: Method, key: Option<&str>) -> Result<RequestBuilder> {
        let mut segments = vec!["accounts", self.account_id.as_str(), "env"];
        segments.extend(key);
        let url = endpoint(&self.base_url, &segments)?;
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(site_id) = &self.site_id {
            request = request.query(&[("site_id", site_id)]);
        }
        Ok(request)
    }

    async fn fetch(&self, key: &str) -> Result<Option<EnvVar>> {
        let response = self
            .request(Method::GET, Some(key))?
            .send()
            .await
            .context("Failed to read Netlify environment variable")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_json(response, Platform::Netlify).await.map(Some)
    }

    async fn create(&self, key: &str, value: &str, context: &str) -> Result<()> {
        let body = json!([{
            "key": key,
            "scopes": DEFAULT_SCOPES,
            "values": [{ "value": value, "context": context }],
        }]);
        let response = self
            .request(Method::POST, None)?
            .json(&body)
            .send()
            .await
            .context("Failed to create Netlify environment variable")?;
        ensure_success(response, Platform::Netlify).await?;
        Ok(())
    }

    async fn replace(&self, existing: &EnvVar, values: &[ContextValue]) -> Result<()> {
        let body = json!({
            "key": existing.key,
            "scopes": existing.scopes,
            "values": values,
        });
        let response = self
            .request(Method::PUT, Some(&existing.key))?
            .json(&body)
            .send()
            .await
            .context("Failed to update Netlify environment variable")?;
        ensure_success(response, Platform::Netlify).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, Some(key))?
            .send()
            .await
            .context("Failed to delete Netlify environment variable")?;
        ensure_success(response, Platform::Netlify).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for NetlifyStore {
    fn platform(&self) -> Platform {
        Platform::Netlify
    }

    async fn validate(&mut self) -> Result<()> {
        let response = self
            .request(Method::GET, None)?
            .send()
            .await
            .context("Failed to reach Netlify")?;
        ensure_success(response, Platform::Netlify).await?;
        Ok(())
    }

    async fn list(&mut self, environment: &str) -> Result<RemoteSecrets> {
        let response = self
            .request(Method::GET, None)?
            .query(&[("context_name", environment)])
            .send()
            .await
            .context("Failed to list Netlify environment variables")?;
        let vars: Vec<EnvVar> = decode_json(response, Platform::Netlify).await?;
        debug!(account = %self.account_id, environment, count = vars.len(), "Fetched Netlify env vars");
        Ok(vars
            .iter()
            .filter_map(|var| {
                var.value_for(environment)
                    .map(|value| (var.key.clone(), RemoteValue::Value(value.to_string())))
            })
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for NetlifyStore {
    async fn set(&mut self, name: &str, value: &str, environment: &str) -> Result<()> {
        let Some(existing) = self.fetch(name).await? else {
            info!(secret = name, environment, "Creating Netlify env var");
            return self.create(name, value, environment).await;
        };

        info!(secret = name, environment, "Updating Netlify env var");
        let mut values: Vec<ContextValue> = existing
            .values
            .iter()
            .filter(|v| v.context != environment)
            .cloned()
            .collect();
        values.push(ContextValue {
            id: None,
            value: value.to_string(),
            context: environment.to_string(),
        });
        self.replace(&existing, &values).await
    }

    async fn delete(&mut self, name: &str, environment: &str) -> Result<()> {
        let Some(existing) = self.fetch(name).await? else {
            return Ok(());
        };

        let remaining: Vec<ContextValue> = existing
            .values
            .iter()
            .filter(|v| v.context != environment)
            .cloned()
            .collect();
        if remaining.len() == existing.values.len() {
            return Ok(());
        }
        if remaining.is_empty() {
            info!(secret = name, environment, "Deleting Netlify env var");
            return self.remove(name).await;
        }
        info!(secret = name, environment, "Removing context from Netlify env var");
        self.replace(&existing, &remaining).await
    }
}
