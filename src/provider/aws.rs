//! # AWS Secrets Manager
//!
//! All secrets of a target live in one Secrets Manager secret, stored as a
//! flat JSON object (`{"API_KEY": "..."}`). Every write reads the object,
//! changes one key and stores a new version of the whole secret. A missing
//! secret reads as empty and is created on the first write.
//!
//! Credentials come from the AWS SDK default chain (environment, shared
//! profile, SSO, instance metadata), never from a token in config.

use crate::model::AwsSecretsManagerConfig;
use crate::provider::{Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// The three Secrets Manager calls the store needs, for one secret
#[async_trait]
pub trait SecretBlobApi: Send + Sync {
    /// Current secret string; `None` when the secret does not exist
    async fn get(&self) -> Result<Option<String>>;

    /// Store a new version. `Ok(false)` when the secret does not exist.
    async fn put(&self, value: &str) -> Result<bool>;

    async fn create(&self, value: &str) -> Result<()>;
}

/// [`SecretBlobApi`] over the AWS SDK. The client is built on first use so
/// that creating a handle stays synchronous.
pub struct SdkSecretBlob {
    region: String,
    profile: Option<String>,
    secret_name: String,
    client: OnceCell<Client>,
}

impl std::fmt::Debug for SdkSecretBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkSecretBlob")
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("secret_name", &self.secret_name)
            .finish_non_exhaustive()
    }
}

impl SdkSecretBlob {
    #[must_use]
    pub fn new(config: &AwsSecretsManagerConfig) -> Self {
        Self {
            region: config.region.clone(),
            profile: config.profile.clone().filter(|p| !p.is_empty()),
            secret_name: config.secret_name.clone(),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()));
                if let Some(profile) = &self.profile {
                    loader = loader.profile_name(profile);
                }
                debug!(region = %self.region, profile = ?self.profile, "Loading AWS SDK config");
                Client::new(&loader.load().await)
            })
            .await
    }
}

#[async_trait]
impl SecretBlobApi for SdkSecretBlob {
    async fn get(&self) -> Result<Option<String>> {
        let result = self
            .client()
            .await
            .get_secret_value()
            .secret_id(&self.secret_name)
            .send()
            .await;
        match result {
            Ok(output) => Ok(Some(output.secret_string().unwrap_or_default().to_string())),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(error) => Err(anyhow!(
                "aws-secretsmanager API error: failed to get secret {}: {}",
                self.secret_name,
                DisplayErrorContext(&error)
            )),
        }
    }

    async fn put(&self, value: &str) -> Result<bool> {
        let result = self
            .client()
            .await
            .put_secret_value()
            .secret_id(&self.secret_name)
            .secret_string(value)
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(error) => Err(anyhow!(
                "aws-secretsmanager API error: failed to put secret value for {}: {}",
                self.secret_name,
                DisplayErrorContext(&error)
            )),
        }
    }

    async fn create(&self, value: &str) -> Result<()> {
        self.client()
            .await
            .create_secret()
            .name(&self.secret_name)
            .secret_string(value)
            .send()
            .await
            .map_err(|error| {
                anyhow!(
                    "aws-secretsmanager API error: failed to create secret {}: {}",
                    self.secret_name,
                    DisplayErrorContext(&error)
                )
            })?;
        Ok(())
    }
}

/// Store handle for one JSON secret
pub struct AwsSecretsManagerStore {
    secret_name: String,
    api: Box<dyn SecretBlobApi>,
}

impl std::fmt::Debug for AwsSecretsManagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManagerStore")
            .field("secret_name", &self.secret_name)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManagerStore {
    #[must_use]
    pub fn new(config: &AwsSecretsManagerConfig) -> Self {
        Self::with_api(config.secret_name.clone(), SdkSecretBlob::new(config))
    }

    /// Store over any [`SecretBlobApi`] implementation
    pub fn with_api(secret_name: impl Into<String>, api: impl SecretBlobApi + 'static) -> Self {
        Self {
            secret_name: secret_name.into(),
            api: Box::new(api),
        }
    }

    async fn read(&self) -> Result<BTreeMap<String, String>> {
        match self.api.get().await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).with_context(|| {
                format!(
                    "aws-secretsmanager: secret {} is not a JSON object of string values",
                    self.secret_name
                )
            }),
            _ => Ok(BTreeMap::new()),
        }
    }

    async fn write(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(data)?;
        if !self.api.put(&raw).await? {
            info!(secret_name = %self.secret_name, "Creating AWS secret");
            self.api.create(&raw).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    fn platform(&self) -> Platform {
        Platform::AwsSecretsManager
    }

    /// Credentials work and the secret exists; a missing secret is created empty
    async fn validate(&mut self) -> Result<()> {
        if self.api.get().await?.is_none() {
            info!(secret_name = %self.secret_name, "Creating empty AWS secret");
            self.api.create("{}").await?;
        }
        Ok(())
    }

    async fn list(&mut self, _environment: &str) -> Result<RemoteSecrets> {
        let data = self.read().await?;
        debug!(secret_name = %self.secret_name, count = data.len(), "Read AWS secret");
        Ok(data
            .into_iter()
            .map(|(name, value)| (name, RemoteValue::Value(value)))
            .collect())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        Some(self)
    }
}

#[async_trait]
impl SecretWriter for AwsSecretsManagerStore {
    async fn set(&mut self, name: &str, value: &str, _environment: &str) -> Result<()> {
        let mut data = self.read().await?;
        data.insert(name.to_string(), value.to_string());
        info!(secret = name, secret_name = %self.secret_name, "Setting key in AWS secret");
        self.write(&data).await
    }

    async fn delete(&mut self, name: &str, _environment: &str) -> Result<()> {
        let mut data = self.read().await?;
        if data.remove(name).is_none() {
            return Ok(());
        }
        info!(secret = name, secret_name = %self.secret_name, "Removing key from AWS secret");
        self.write(&data).await
    }
}
