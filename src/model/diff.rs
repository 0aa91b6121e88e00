//! # Diff Model
//!
//! Per-secret comparison outcomes for one (target, remote environment) pair.

use crate::model::result::SyncCounts;
use crate::provider::Platform;
use std::fmt;

/// Classification of one secret's local vs remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiffKind {
    Add,
    /// Present in the type system only; sync never emits removals
    Remove,
    Change,
    Unchanged,
    /// Remote holds the name but its value cannot be trusted or read
    Unknown,
}

impl DiffKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Add => "add",
            DiffKind::Remove => "remove",
            DiffKind::Change => "change",
            DiffKind::Unchanged => "unchanged",
            DiffKind::Unknown => "unknown",
        }
    }

    /// Single-character marker used by plain-text output
    #[must_use]
    pub fn marker(&self) -> char {
        match self {
            DiffKind::Add => '+',
            DiffKind::Remove => '-',
            DiffKind::Change => '~',
            DiffKind::Unchanged => '=',
            DiffKind::Unknown => '?',
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub name: String,
    pub kind: DiffKind,
    /// Remote value; `None` when absent or unreadable
    pub old_value: Option<String>,
    pub new_value: String,
    pub environment: String,
}

/// Ordered diff entries for one target and remote environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDiff {
    pub target_name: String,
    pub platform: Platform,
    pub project: String,
    pub environment: String,
    pub entries: Vec<DiffEntry>,
}

impl TargetDiff {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.kind != DiffKind::Unchanged)
    }

    /// Tally of classifications; `failed` is always zero for a preview
    #[must_use]
    pub fn count_by_kind(&self) -> SyncCounts {
        let mut counts = SyncCounts::default();
        for entry in &self.entries {
            counts.record(entry.kind);
        }
        counts
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
