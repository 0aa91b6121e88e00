//! # Vercel
//!
//! Project environment variables through the Vercel REST API.
//!
//! A Vercel variable carries a list of target environments. Writes keep each
//! environment's value independent: a variable shared with other environments
//! has this environment split off into its own variable instead of being
//! overwritten for everyone. If creating the split-off variable fails, the
//! shared variable gets its original environments back.
//!
//! References:
//! - [Vercel REST API: project environment variables](https://vercel.com/docs/rest-api/reference/endpoints/projects)

use crate::model::VercelConfig;
use crate::provider::common::{decode_json, endpoint, ensure_success};
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.vercel.com";

/// Variable type used for values written by this tool
const ENCRYPTED_TYPE: &str = "encrypted";

#[derive(Debug, Clone, Deserialize)]
struct EnvVar {
    id: String,
    key: String,
    /// Absent for sensitive variables whose value the API never returns
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    target: Vec<String>,
}

impl EnvVar {
    fn targets(&self, environment: &str) -> bool {
        self.target.iter().any(|t| t == environment)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    envs: Vec<EnvVar>,
}

/// Store handle for one Vercel project
pub struct VercelStore {
    http: Client,
    base_url: String,
    token: String,
    project: String,
    team_id: Option<String>,
    /// Last fetched variable list; owned by this handle only
    env_vars: Vec<EnvVar>,
}

impl std::fmt::Debug for VercelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelStore")
            .field("project", &self.project)
            .field("team_id", &self.team_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl VercelStore {
    #[must_use]
    pub fn new(http: Client, token: String, config: &VercelConfig) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            project: config.project.clone(),
            team_id: config.team_id.clone().filter(|t| !t.is_empty()),
            env_vars: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = endpoint(&self.base_url, segments)?;
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(team_id) = &self.team_id {
            request = request.query(&[("teamId", team_id)]);
        }
        Ok(request)
    }

    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .request(Method::GET, &["v9", "projects", &self.project, "env"])?
            .send()
            .await
            .context("Failed to list Vercel environment variables")?;
        let list: ListResponse = decode_json(response, Platform::Vercel).await?;
        debug!(project = %self.project, count = list.envs.len(), "Fetched Vercel env vars");
        self.env_vars = list.envs;
        Ok(())
    }

    async fn create(&self, name: &str, value: &str, environment: &str) -> Result<()> {
        let body = json!({
            "key": name,
            "value": value,
            "target": [environment],
            "type": ENCRYPTED_TYPE,
        });
        let response = self
            .request(Method::POST, &["v10", "projects", &self.project, "env"])?
            .json(&body)
            .send()
            .await
            .context("Failed to create Vercel environment variable")?;
        ensure_success(response, Platform::Vercel).await?;
        Ok(())
    }

    async fn update(&self, id: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .request(Method::PATCH, &["v9", "projects", &self.project, "env", id])?
            .json(&body)
            .send()
            .await
            .context("Failed to update Vercel environment variable")?;
        ensure_success(response, Platform::Vercel).await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &["v9", "projects", &self.project, "env", id])?
            .send()
            .await
            .context("Failed to delete Vercel environment variable")?;
        ensure_success(response, Platform::Vercel).await?;
        Ok(())
    }

    fn find(&self, name: &str, environment: &str) -> Option<EnvVar> {
        self.env_vars
            .iter()
            .find(|e| e.key == name && e.targets(environment))
            .cloned()
    }

    /// Drop `environment` from a variable that is shared with other environments
    async fn detach(&self, existing: &EnvVar, environment: &str) -> Result<()> {
        let remaining: Vec<&String> = existing.target.iter().filter(|t| *t != environment).collect();
        self.update(&existing.id, json!({ "target": remaining })).await
    }
}

#[async_trait]
impl SecretStore for VercelStore {
    fn platform(&self) -> Platform {
        Platform::Vercel
    }

    async fn validate(&mut self) -> Result<()> {
        let response = self
            .request(Method::GET, &["v2", "user"])?
            .send()
            .await
            .context("Failed to reach Vercel")?;
        ensure_success(response, Platform::Vercel).await?;
        Ok(())
    }

    async fn list(&mut self, environment: &str) -> Result<RemoteSecrets> {
        self.refresh().await?;
        Ok(self
            .env_vars
            .iter()
            .filter(|e| e.targets(environment))
            .map(|e| {
                let value = e
                    .value
                    .clone()
                    .map_or(RemoteValue::Redacted, RemoteValue::Value);
                (e.key.clone(), value)
            })
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for VercelStore {
    async fn set(&mut self, name: &str, value: &str, environment: &str) -> Result<()> {
        self.refresh().await?;

        match self.find(name, environment) {
            Some(existing) if existing.target.len() == 1 => {
                info!(secret = name, environment, "Updating Vercel env var");
                self.update(
                    &existing.id,
                    json!({ "value": value, "target": existing.target, "type": ENCRYPTED_TYPE }),
                )
                .await
            }
            Some(existing) => {
                info!(secret = name, environment, "Splitting shared Vercel env var");
                self.detach(&existing, environment).await?;
                if let Err(error) = self.create(name, value, environment).await {
                    warn!(secret = name, environment, "Split failed, restoring shared Vercel env var");
                    if let Err(restore) = self
                        .update(&existing.id, json!({ "target": existing.target }))
                        .await
                    {
                        return Err(error.context(format!(
                            "{name} was detached from {environment} and could not be restored: {restore}"
                        )));
                    }
                    return Err(error);
                }
                Ok(())
            }
            None => {
                info!(secret = name, environment, "Creating Vercel env var");
                self.create(name, value, environment).await
            }
        }
    }

    async fn delete(&mut self, name: &str, environment: &str) -> Result<()> {
        self.refresh().await?;

        match self.find(name, environment) {
            None => Ok(()),
            Some(existing) if existing.target.len() == 1 => {
                info!(secret = name, environment, "Deleting Vercel env var");
                self.remove(&existing.id).await
            }
            Some(existing) => {
                info!(secret = name, environment, "Removing environment from Vercel env var");
                self.detach(&existing, environment).await
            }
        }
    }
}
