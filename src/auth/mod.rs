//! # Credential Resolution
//!
//! Resolves the bearer credential for a target.
//!
//! Resolution order:
//! 1. The platform's environment variable (`VERCEL_TOKEN`, ...), when non-empty
//! 2. An inline `token` / `deploy_key` / `api_key` field from the target config,
//!    with `${VAR}` references expanded. A value that expands to nothing counts
//!    as absent.
//! 3. Not found
//!
//! Platforms that authenticate through their SDK's own credential chain skip
//! all of this; the SDK reports problems on first use.

use crate::error::CredentialError;
use crate::model::{PlatformConfig, Target};
use crate::provider::Platform;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Where a credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    Config,
    /// The platform SDK's default credential chain
    Sdk,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env => f.write_str("env"),
            CredentialSource::Config => f.write_str("config"),
            CredentialSource::Sdk => f.write_str("sdk"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub source: CredentialSource,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Authentication status of one target, as shown by `status` and the sync pre-flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    pub target_name: String,
    pub platform: Platform,
    pub authenticated: bool,
    /// `None` for local files and failures
    pub source: Option<CredentialSource>,
    pub env_var: Option<&'static str>,
    pub error: Option<String>,
}

type VarLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct CredentialResolver {
    lookup: VarLookup,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    /// Resolver backed by the process environment
    #[must_use]
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Resolver backed by a custom variable lookup
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    /// Expand `${VAR}` / `$VAR` references; unset variables expand to nothing
    fn expand(&self, raw: &str) -> String {
        shellexpand::env_with_context_no_errors(raw, |name: &str| {
            Some(self.var(name).unwrap_or_default())
        })
        .into_owned()
    }

    pub fn resolve(
        &self,
        platform: Platform,
        config: &PlatformConfig,
    ) -> Result<Credentials, CredentialError> {
        let env_var = platform.info().env_var;

        if let Some(token) = env_var.and_then(|var| self.var(var)) {
            debug!(platform = %platform, "Resolved credential from environment");
            return Ok(Credentials {
                token,
                source: CredentialSource::Env,
            });
        }

        for (field, raw) in config.inline_credentials() {
            if raw.is_empty() {
                continue;
            }
            let token = self.expand(raw);
            if !token.is_empty() {
                debug!(platform = %platform, field, "Resolved credential from config");
                return Ok(Credentials {
                    token,
                    source: CredentialSource::Config,
                });
            }
        }

        Err(CredentialError::NotFound { platform, env_var })
    }

    #[must_use]
    pub fn check_auth(&self, target: &Target) -> AuthStatus {
        let platform = target.platform();
        let mut status = AuthStatus {
            target_name: target.name.clone(),
            platform,
            authenticated: false,
            source: None,
            env_var: platform.info().env_var,
            error: None,
        };

        if platform.is_credential_free() {
            status.authenticated = true;
            return status;
        }
        if platform.uses_sdk_auth() {
            status.authenticated = true;
            status.source = Some(CredentialSource::Sdk);
            return status;
        }

        match self.resolve(platform, &target.config) {
            Ok(credentials) => {
                status.authenticated = true;
                status.source = Some(credentials.source);
            }
            Err(e) => status.error = Some(e.to_string()),
        }
        status
    }
}
