//! # Sync Results
//!
//! Outcome of an apply pass: per-secret outcomes plus aggregate counters.

use crate::error::SecretWriteError;
use crate::model::diff::{DiffKind, TargetDiff};
use std::ops::AddAssign;

/// Aggregate counters for one pass, or a whole run when summed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub added: usize,
    pub changed: usize,
    pub unknown: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SyncCounts {
    /// Count a classification that completed (or would complete, in dry-run)
    pub fn record(&mut self, kind: DiffKind) {
        match kind {
            DiffKind::Add => self.added += 1,
            DiffKind::Change => self.changed += 1,
            DiffKind::Unknown => self.unknown += 1,
            DiffKind::Unchanged => self.unchanged += 1,
            DiffKind::Remove => {}
        }
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.added + self.changed + self.unknown
    }
}

impl AddAssign for SyncCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.changed += rhs.changed;
        self.unknown += rhs.unknown;
        self.unchanged += rhs.unchanged;
        self.failed += rhs.failed;
    }
}

/// Outcome of one attempted write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretOutcome {
    pub name: String,
    pub environment: String,
    pub action: DiffKind,
    pub success: bool,
    pub error: Option<String>,
}

/// Result of applying one target diff
#[derive(Debug)]
pub struct SyncResult {
    pub target_name: String,
    pub environment: String,
    pub dry_run: bool,
    pub counts: SyncCounts,
    pub errors: Vec<SecretWriteError>,
    pub outcomes: Vec<SecretOutcome>,
    /// The preview this result was derived from
    pub diff: TargetDiff,
}

impl SyncResult {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }
}
