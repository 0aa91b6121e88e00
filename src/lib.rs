//! # envsync
//!
//! Keeps a schema of secret names in sync between local env files and
//! deployment platforms (Vercel, Convex, Fly.io, Railway, Netlify, Render, AWS Secrets
//! Manager, local `.env` files).
//!
//! The schema and the targets live in `envsync.yaml`; values live only in
//! local env files, the process environment and the platforms themselves.
//! Syncing is additive: a name missing locally is never deleted remotely.

pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod observability;
pub mod provider;
pub mod source;
pub mod sync;

pub use error::{ConfigError, CredentialError, SecretWriteError, SyncError};
pub use model::{
    DiffEntry, DiffKind, EnvironmentMapping, LocalEnvironment, PlatformConfig, SyncCounts,
    SyncResult, Target, TargetDiff,
};
pub use provider::{Platform, PlatformRegistry, RemoteValue, SecretStore, SecretWriter, StoreFactory};
pub use sync::{ApplyOptions, Orchestrator, RunReport, SyncEngine, SyncRun};
