//! Common test utilities
//!
//! An in-memory [`StoreFactory`] whose stores share state with the test, so
//! tests can seed remote values and inspect every write afterwards.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::{bail, Result};
use async_trait::async_trait;
use envsync::auth::AuthStatus;
use envsync::model::{DotenvConfig, EnvironmentMapping, LocalEnvironment, PlatformConfig, Target};
use envsync::provider::{
    Platform, RemoteSecrets, RemoteValue, SecretStore, SecretWriter, StoreFactory,
};
use envsync::SyncError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Install the ring crypto provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Already installed by another dependency is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Remote state of one in-memory backend
#[derive(Debug, Default)]
pub struct MemoryState {
    /// environment -> name -> value
    pub values: BTreeMap<String, BTreeMap<String, String>>,
    /// (name, value, environment) for every successful set
    pub sets: Vec<(String, String, String)>,
    pub deletes: Vec<(String, String)>,
    pub list_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pub state: Arc<Mutex<MemoryState>>,
    pub write_only: bool,
    pub read_only: bool,
    /// Names whose writes fail
    pub failing: BTreeSet<String>,
    pub fail_list: bool,
    /// Yield once before every write so a concurrent cancellation can win
    pub yield_on_write: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    pub fn fail_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn yield_on_write(mut self) -> Self {
        self.yield_on_write = true;
        self
    }

    /// Seed a remote value
    pub fn seed(self, env: &str, name: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .values
            .entry(env.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn value(&self, env: &str, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .values
            .get(env)
            .and_then(|vals| vals.get(name).cloned())
    }

    pub fn values(&self, env: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .values
            .get(env)
            .cloned()
            .unwrap_or_default()
    }

    pub fn sets(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().sets.clone()
    }

    pub fn set_names(&self) -> Vec<String> {
        self.sets().into_iter().map(|(name, _, _)| name).collect()
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    backend: MemoryBackend,
    platform: Platform,
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_write_only(&self) -> bool {
        self.backend.write_only
    }

    async fn validate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list(&mut self, environment: &str) -> Result<RemoteSecrets> {
        if self.backend.fail_list {
            bail!("connection refused");
        }
        let mut state = self.backend.state.lock().unwrap();
        state.list_calls += 1;
        let write_only = self.backend.write_only;
        Ok(state
            .values
            .get(environment)
            .map(|values| {
                values
                    .iter()
                    .map(|(name, value)| {
                        let remote = if write_only {
                            RemoteValue::Redacted
                        } else {
                            RemoteValue::Value(value.clone())
                        };
                        (name.clone(), remote)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn writer(&mut self) -> Option<&mut dyn SecretWriter> {
        if self.backend.read_only {
            None
        } else {
            Some(self)
        }
    }
}

#[async_trait]
impl SecretWriter for MemoryStore {
    async fn set(&mut self, name: &str, value: &str, environment: &str) -> Result<()> {
        if self.backend.yield_on_write {
            tokio::task::yield_now().await;
        }
        if self.backend.failing.contains(name) {
            bail!("rate limited");
        }
        let mut state = self.backend.state.lock().unwrap();
        state
            .values
            .entry(environment.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        state
            .sets
            .push((name.to_string(), value.to_string(), environment.to_string()));
        Ok(())
    }

    async fn delete(&mut self, name: &str, environment: &str) -> Result<()> {
        let mut state = self.backend.state.lock().unwrap();
        if let Some(values) = state.values.get_mut(environment) {
            values.remove(name);
        }
        state
            .deletes
            .push((name.to_string(), environment.to_string()));
        Ok(())
    }
}

/// Factory handing out [`MemoryStore`]s keyed by target name
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    backends: BTreeMap<String, MemoryBackend>,
    unauthenticated: BTreeSet<String>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, target: &str, backend: MemoryBackend) -> Self {
        self.backends.insert(target.to_string(), backend);
        self
    }

    pub fn unauthenticated(mut self, target: &str) -> Self {
        self.unauthenticated.insert(target.to_string());
        self
    }
}

impl StoreFactory for MemoryFactory {
    fn create(&self, target: &Target) -> Result<Box<dyn SecretStore>, SyncError> {
        let backend = self
            .backends
            .get(&target.name)
            .cloned()
            .ok_or_else(|| SyncError::Configuration {
                target: target.name.clone(),
                message: "no backend registered".to_string(),
            })?;
        Ok(Box::new(MemoryStore {
            backend,
            platform: target.platform(),
        }))
    }

    fn check_auth(&self, target: &Target) -> AuthStatus {
        let authenticated = !self.unauthenticated.contains(&target.name);
        AuthStatus {
            target_name: target.name.clone(),
            platform: target.platform(),
            authenticated,
            source: None,
            env_var: None,
            error: (!authenticated).then(|| "credentials not found".to_string()),
        }
    }
}

/// A credential-free target named `name` with the given mapping
pub fn target(name: &str, mapping: &[(&str, LocalEnvironment)]) -> Target {
    Target::new(
        name,
        PlatformConfig::Dotenv(DotenvConfig::default()),
        mapping.iter().copied().collect::<EnvironmentMapping>(),
    )
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

pub fn local(values: &[(&str, &str)]) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
