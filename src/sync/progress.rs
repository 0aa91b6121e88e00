//! Progress events emitted around each individual write.

use crate::model::DiffKind;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Started,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub target: String,
    pub secret: String,
    pub environment: String,
    pub action: DiffKind,
    /// Always `false` for `Started`
    pub success: bool,
    pub error: Option<String>,
}

/// Observer for progress events; has no influence on control flow
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
