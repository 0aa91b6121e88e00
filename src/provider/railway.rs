//! # Railway
//!
//! Project variables through the Railway GraphQL API. Config names
//! environments (`production`, `staging`); the API wants environment IDs, so
//! the project's environment list is fetched once per handle and cached.
//!
//! With `service_id` set, variables are scoped to that service. Without it
//! they are shared project variables.

use crate::model::RailwayConfig;
use crate::provider::common::decode_json;
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://backboard.railway.com/graphql/v2";

const ENVIRONMENTS_QUERY: &str =
    "query project($id: String!) { project(id: $id) { environments { edges { node { id name } } } } }";
const VARIABLES_QUERY: &str = "query variables($projectId: String!, $environmentId: String!, $serviceId: String) \
     { variables(projectId: $projectId, environmentId: $environmentId, serviceId: $serviceId) }";
const UPSERT_MUTATION: &str =
    "mutation variableUpsert($input: VariableUpsertInput!) { variableUpsert(input: $input) }";
const DELETE_MUTATION: &str =
    "mutation variableDelete($input: VariableDeleteInput!) { variableDelete(input: $input) }";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    project: Project,
}

#[derive(Debug, Deserialize)]
struct Project {
    environments: Connection,
}

#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: EnvironmentNode,
}

#[derive(Debug, Deserialize)]
struct EnvironmentNode {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct VariablesData {
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

/// Store handle for one Railway project (optionally one service in it)
pub struct RailwayStore {
    http: Client,
    base_url: String,
    token: String,
    project_id: String,
    service_id: Option<String>,
    /// Environment name -> ID, fetched on first use
    environment_ids: Option<BTreeMap<String, String>>,
}

impl std::fmt::Debug for RailwayStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RailwayStore")
            .field("project_id", &self.project_id)
            .field("service_id", &self.service_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RailwayStore {
    #[must_use]
    pub fn new(http: Client, token: String, config: &RailwayConfig) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            project_id: config.project_id.clone(),
            service_id: config.service_id.clone().filter(|s| !s.is_empty()),
            environment_ids: None,
        }
    }

    /// GraphQL endpoint to post to, in full
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .context("Failed to reach Railway")?;
        let body: GraphqlResponse = decode_json(response, Platform::Railway).await?;
        if let Some(error) = body.errors.first() {
            bail!("railway API error: {}", error.message);
        }
        let data = body
            .data
            .ok_or_else(|| anyhow!("railway API error: response has no data"))?;
        serde_json::from_value(data).context("railway API returned an unexpected response body")
    }

    async fn environments(&mut self) -> Result<&BTreeMap<String, String>> {
        if self.environment_ids.is_none() {
            let data: ProjectData = self
                .graphql(ENVIRONMENTS_QUERY, json!({ "id": self.project_id }))
                .await?;
            let ids: BTreeMap<String, String> = data
                .project
                .environments
                .edges
                .into_iter()
                .map(|edge| (edge.node.name, edge.node.id))
                .collect();
            debug!(project = %self.project_id, count = ids.len(), "Fetched Railway environments");
            self.environment_ids = Some(ids);
        }
        Ok(self.environment_ids.get_or_insert_with(BTreeMap::new))
    }

    async fn environment_id(&mut self, environment: &str) -> Result<String> {
        self.environments()
            .await?
            .get(environment)
            .cloned()
            .ok_or_else(|| anyhow!("railway: environment {environment:?} not found in project"))
    }

    /// Project, environment and (when scoped) service for a variables call
    fn scope(&self, environment_id: &str) -> Value {
        let mut scope = json!({
            "projectId": self.project_id,
            "environmentId": environment_id,
        });
        if let Some(service_id) = &self.service_id {
            scope["serviceId"] = json!(service_id);
        }
        scope
    }
}

#[async_trait]
impl SecretStore for RailwayStore {
    fn platform(&self) -> Platform {
        Platform::Railway
    }

    async fn validate(&mut self) -> Result<()> {
        self.environment_ids = None;
        self.environments().await.map(|_| ())
    }

    async fn list(&mut self, environment: &str) -> Result<RemoteSecrets> {
        let environment_id = self.environment_id(environment).await?;
        let data: VariablesData = self
            .graphql(VARIABLES_QUERY, self.scope(&environment_id))
            .await?;
        debug!(project = %self.project_id, environment, count = data.variables.len(), "Fetched Railway variables");
        Ok(data
            .variables
            .into_iter()
            .map(|(name, value)| (name, RemoteValue::Value(value)))
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for RailwayStore {
    async fn set(&mut self, name: &str, value: &str, environment: &str) -> Result<()> {
        let environment_id = self.environment_id(environment).await?;
        info!(secret = name, environment, "Upserting Railway variable");
        let mut input = self.scope(&environment_id);
        input["name"] = json!(name);
        input["value"] = json!(value);
        let _: Value = self
            .graphql(UPSERT_MUTATION, json!({ "input": input }))
            .await?;
        Ok(())
    }

    async fn delete(&mut self, name: &str, environment: &str) -> Result<()> {
        let environment_id = self.environment_id(environment).await?;
        info!(secret = name, environment, "Deleting Railway variable");
        let mut input = self.scope(&environment_id);
        input["name"] = json!(name);
        let _: Value = self
            .graphql(DELETE_MUTATION, json!({ "input": input }))
            .await?;
        Ok(())
    }
}
