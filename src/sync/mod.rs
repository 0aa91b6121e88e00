//! # Sync
//!
//! Diffing and applying secret values: the per-target [`SyncEngine`], the
//! multi-target [`Orchestrator`], name filters and progress events.

pub mod engine;
pub mod filter;
pub mod orchestrator;
pub mod progress;

pub use engine::{classify, ApplyOptions, SyncEngine};
pub use filter::{filter_secret_names, should_sync};
pub use orchestrator::{
    ContinuationPolicy, Orchestrator, PassOutcome, PassReport, RunReport, SyncRun,
};
pub use progress::{ProgressCallback, ProgressEvent, ProgressPhase};
