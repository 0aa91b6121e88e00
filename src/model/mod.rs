//! # Data Model
//!
//! Targets, environment mappings, diffs and sync results. Targets and mappings
//! come from config and are never mutated; diffs and results are built fresh
//! per invocation and never persisted.

pub mod diff;
pub mod environment;
pub mod result;
pub mod target;

pub use diff::{DiffEntry, DiffKind, TargetDiff};
pub use environment::{EnvironmentMapping, LocalEnvironment};
pub use result::{SecretOutcome, SyncCounts, SyncResult};
pub use target::{
    AwsSecretsManagerConfig, ConvexConfig, DotenvConfig, FlyioConfig, NetlifyConfig,
    PlatformConfig, RailwayConfig, RenderConfig, SecretFilter, Target, VercelConfig,
};
