//! # Store Registry
//!
//! Builds store handles for targets. The set of platforms is the [`Platform`]
//! enum, dispatched in one match; there is no registration step.

use crate::auth::{AuthStatus, CredentialResolver};
use crate::error::SyncError;
use crate::model::{PlatformConfig, Target};
use crate::provider::aws::AwsSecretsManagerStore;
use crate::provider::common::build_http_client;
use crate::provider::convex::ConvexStore;
use crate::provider::dotenv::DotenvStore;
use crate::provider::flyio::FlyioStore;
use crate::provider::netlify::NetlifyStore;
use crate::provider::railway::RailwayStore;
use crate::provider::render::RenderStore;
use crate::provider::vercel::VercelStore;
use crate::provider::{Platform, SecretStore};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Creates store handles and answers authentication checks for targets
pub trait StoreFactory: Send + Sync {
    /// Build a fresh handle for `target`. Fails before any network call when
    /// required configuration or credentials are missing.
    fn create(&self, target: &Target) -> Result<Box<dyn SecretStore>, SyncError>;

    fn check_auth(&self, target: &Target) -> AuthStatus;
}

/// Production factory for the built-in platforms
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    resolver: CredentialResolver,
    timeout: Duration,
    base_urls: BTreeMap<Platform, String>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new(
            CredentialResolver::new(),
            Duration::from_secs(crate::constants::DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }
}

impl PlatformRegistry {
    #[must_use]
    pub fn new(resolver: CredentialResolver, timeout: Duration) -> Self {
        Self {
            resolver,
            timeout,
            base_urls: BTreeMap::new(),
        }
    }

    /// Send requests for `platform` to `base_url` instead of the public API
    #[must_use]
    pub fn with_base_url(mut self, platform: Platform, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(platform, base_url.into());
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    fn token(&self, target: &Target) -> Result<String, SyncError> {
        self.resolver
            .resolve(target.platform(), &target.config)
            .map(|credentials| credentials.token)
            .map_err(|source| SyncError::Credentials {
                target: target.name.clone(),
                source,
            })
    }

    fn http_client(&self, target: &Target) -> Result<reqwest::Client, SyncError> {
        build_http_client(self.timeout).map_err(|e| SyncError::Configuration {
            target: target.name.clone(),
            message: format!("{e:#}"),
        })
    }

    fn base_url(&self, platform: Platform) -> Option<&str> {
        self.base_urls.get(&platform).map(String::as_str)
    }
}

/// Reject blank required fields at handle construction
fn require(target: &Target, field: &str, value: &str) -> Result<(), SyncError> {
    if value.trim().is_empty() {
        return Err(SyncError::Configuration {
            target: target.name.clone(),
            message: format!("{} target requires '{field}'", target.platform()),
        });
    }
    Ok(())
}

impl StoreFactory for PlatformRegistry {
    fn create(&self, target: &Target) -> Result<Box<dyn SecretStore>, SyncError> {
        debug!(target_name = %target.name, platform = %target.platform(), "Creating store handle");

        let store: Box<dyn SecretStore> = match &target.config {
            PlatformConfig::Dotenv(config) => Box::new(DotenvStore::new(config)),
            PlatformConfig::Vercel(config) => {
                require(target, "project", &config.project)?;
                let token = self.token(target)?;
                let mut store = VercelStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Vercel) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            PlatformConfig::Convex(config) => {
                require(target, "deployment", &config.deployment)?;
                let token = self.token(target)?;
                let mut store = ConvexStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Convex) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            PlatformConfig::Flyio(config) => {
                require(target, "app_name", &config.app_name)?;
                let token = self.token(target)?;
                let mut store = FlyioStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Flyio) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            PlatformConfig::Railway(config) => {
                require(target, "project_id", &config.project_id)?;
                let token = self.token(target)?;
                let mut store = RailwayStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Railway) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            PlatformConfig::Netlify(config) => {
                require(target, "account_id", &config.account_id)?;
                let token = self.token(target)?;
                let mut store = NetlifyStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Netlify) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            PlatformConfig::Render(config) => {
                require(target, "service_id", &config.service_id)?;
                let token = self.token(target)?;
                let mut store = RenderStore::new(self.http_client(target)?, token, config);
                if let Some(url) = self.base_url(Platform::Render) {
                    store = store.with_base_url(url);
                }
                Box::new(store)
            }
            // SDK credential chain: no token to resolve here
            PlatformConfig::AwsSecretsManager(config) => {
                require(target, "region", &config.region)?;
                require(target, "secret_name", &config.secret_name)?;
                Box::new(AwsSecretsManagerStore::new(config))
            }
        };

        Ok(store)
    }

    fn check_auth(&self, target: &Target) -> AuthStatus {
        self.resolver.check_auth(target)
    }
}
