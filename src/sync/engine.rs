//! # Reconciliation Engine
//!
//! Computes the diff between local values and one remote environment of a
//! target, and applies it.
//!
//! ## Classification
//!
//! Evaluated per secret name, first match wins:
//!
//! 1. No local value, or an empty one: no entry at all. Local absence never
//!    deletes anything remotely.
//! 2. The store is write-only, or the remote value is redacted, and the name
//!    exists remotely: `Unknown`.
//! 3. No remote entry: `Add`.
//! 4. Remote value differs: `Change`.
//! 5. Otherwise: `Unchanged`.
//!
//! ## Apply
//!
//! Apply always previews first and writes every entry that is not `Unchanged`.
//! A failed write is recorded in the result and the pass moves on to the next
//! secret. Apply never deletes.

use crate::auth::AuthStatus;
use crate::error::{Capability, SecretWriteError, SyncError};
use crate::model::{DiffEntry, DiffKind, SecretOutcome, SyncCounts, SyncResult, Target, TargetDiff};
use crate::observability::mask_secret_value;
use crate::provider::{PlatformRegistry, RemoteValue, SecretStore, StoreFactory};
use crate::source::LocalSource;
use crate::sync::filter::filter_secret_names;
use crate::sync::progress::{ProgressCallback, ProgressEvent, ProgressPhase};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn, Instrument};

/// Classify one secret. `None` means the name is left out of the diff.
#[must_use]
pub fn classify(
    local: Option<&str>,
    remote: Option<&RemoteValue>,
    write_only: bool,
) -> Option<DiffKind> {
    let local = local.filter(|value| !value.is_empty())?;
    let kind = match remote {
        Some(remote) if write_only || matches!(remote, RemoteValue::Redacted) => DiffKind::Unknown,
        None => DiffKind::Add,
        Some(RemoteValue::Value(current)) if current != local => DiffKind::Change,
        Some(_) => DiffKind::Unchanged,
    };
    Some(kind)
}

#[derive(Clone, Default)]
pub struct ApplyOptions {
    /// Tally what would happen without writing
    pub dry_run: bool,
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ApplyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyOptions")
            .field("dry_run", &self.dry_run)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ApplyOptions {
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            progress: None,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }
}

/// Reconciliation engine over a store factory
#[derive(Debug, Clone, Default)]
pub struct SyncEngine<F: StoreFactory = PlatformRegistry> {
    factory: F,
}

impl<F: StoreFactory> SyncEngine<F> {
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    #[must_use]
    pub fn check_auth(&self, target: &Target) -> AuthStatus {
        self.factory.check_auth(target)
    }

    /// Diff `names` between `source` and `remote_env` of `target` without writing
    pub async fn preview(
        &self,
        names: &[String],
        source: &dyn LocalSource,
        target: &Target,
        remote_env: &str,
    ) -> Result<TargetDiff, SyncError> {
        let mut store = self.factory.create(target)?;
        preview_with(store.as_mut(), names, source, target, remote_env).await
    }

    /// Preview, then write every entry that is not `Unchanged`
    pub async fn apply(
        &self,
        names: &[String],
        source: &dyn LocalSource,
        target: &Target,
        remote_env: &str,
        options: &ApplyOptions,
    ) -> Result<SyncResult, SyncError> {
        let span = info_span!(
            "sync.apply",
            target_name = %target.name,
            platform = %target.platform(),
            environment = remote_env,
            dry_run = options.dry_run
        );
        self.apply_inner(names, source, target, remote_env, options)
            .instrument(span)
            .await
    }

    async fn apply_inner(
        &self,
        names: &[String],
        source: &dyn LocalSource,
        target: &Target,
        remote_env: &str,
        options: &ApplyOptions,
    ) -> Result<SyncResult, SyncError> {
        let mut store = self.factory.create(target)?;

        if !options.dry_run && store.writer().is_none() {
            return Err(unsupported(target, Capability::ReadOnly, "write secrets"));
        }

        let diff = preview_with(store.as_mut(), names, source, target, remote_env).await?;

        let mut counts = SyncCounts::default();
        let mut errors = Vec::new();
        let mut outcomes = Vec::new();

        if options.dry_run {
            for entry in &diff.entries {
                counts.record(entry.kind);
            }
            debug!(?counts, "Dry run tallied");
        } else {
            let writer = store
                .writer()
                .ok_or_else(|| unsupported(target, Capability::ReadOnly, "write secrets"))?;

            for entry in &diff.entries {
                if entry.kind == DiffKind::Unchanged {
                    counts.unchanged += 1;
                    continue;
                }

                options.emit(event(target, entry, ProgressPhase::Started, None));

                match writer.set(&entry.name, &entry.new_value, remote_env).await {
                    Ok(()) => {
                        debug!(
                            secret = %entry.name,
                            action = %entry.kind,
                            value = %mask_secret_value(&entry.new_value),
                            "Secret written"
                        );
                        counts.record(entry.kind);
                        outcomes.push(outcome(entry, None));
                        options.emit(event(target, entry, ProgressPhase::Finished, None));
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        warn!(secret = %entry.name, error = %message, "Failed to write secret");
                        counts.failed += 1;
                        outcomes.push(outcome(entry, Some(message.clone())));
                        errors.push(SecretWriteError {
                            name: entry.name.clone(),
                            source: e,
                        });
                        options.emit(event(
                            target,
                            entry,
                            ProgressPhase::Finished,
                            Some(message),
                        ));
                    }
                }
            }

            info!(
                added = counts.added,
                changed = counts.changed,
                unknown = counts.unknown,
                unchanged = counts.unchanged,
                failed = counts.failed,
                "Sync pass finished"
            );
        }

        Ok(SyncResult {
            target_name: target.name.clone(),
            environment: remote_env.to_string(),
            dry_run: options.dry_run,
            counts,
            errors,
            outcomes,
            diff,
        })
    }

    /// Read every readable value from `remote_env` of `target`.
    /// Write-only platforms are rejected before any network call.
    pub async fn pull(
        &self,
        target: &Target,
        remote_env: &str,
    ) -> Result<BTreeMap<String, String>, SyncError> {
        if target.platform().is_write_only() {
            return Err(unsupported(target, Capability::WriteOnly, "pull secrets"));
        }

        let mut store = self.factory.create(target)?;
        let remote = store
            .list(remote_env)
            .await
            .map_err(|source| SyncError::RemoteRead {
                target: target.name.clone(),
                source,
            })?;

        let mut values = BTreeMap::new();
        for (name, value) in remote {
            match value {
                RemoteValue::Value(v) => {
                    values.insert(name, v);
                }
                RemoteValue::Redacted => {
                    debug!(secret = %name, "Skipping redacted value");
                }
            }
        }
        Ok(values)
    }
}

async fn preview_with(
    store: &mut dyn SecretStore,
    names: &[String],
    source: &dyn LocalSource,
    target: &Target,
    remote_env: &str,
) -> Result<TargetDiff, SyncError> {
    let filtered = filter_secret_names(names, target);
    let local = source.get_all(&filtered);

    let remote = store
        .list(remote_env)
        .await
        .map_err(|source| SyncError::RemoteRead {
            target: target.name.clone(),
            source,
        })?;

    // Capability metadata, not inferred from the list result
    let write_only = store.is_write_only();

    let entries: Vec<DiffEntry> = filtered
        .iter()
        .filter_map(|name| {
            let local_value = local.get(name).map(String::as_str);
            let remote_value = remote.get(name);
            classify(local_value, remote_value, write_only).map(|kind| DiffEntry {
                name: name.clone(),
                kind,
                old_value: remote_value.and_then(RemoteValue::as_value).map(str::to_string),
                new_value: local_value.unwrap_or_default().to_string(),
                environment: remote_env.to_string(),
            })
        })
        .collect();

    let diff = TargetDiff {
        target_name: target.name.clone(),
        platform: target.platform(),
        project: target.project().to_string(),
        environment: remote_env.to_string(),
        entries,
    };

    let counts = diff.count_by_kind();
    debug!(
        target_name = %target.name,
        environment = remote_env,
        considered = filtered.len(),
        add = counts.added,
        change = counts.changed,
        unknown = counts.unknown,
        unchanged = counts.unchanged,
        "Preview computed"
    );
    Ok(diff)
}

fn unsupported(target: &Target, capability: Capability, operation: &'static str) -> SyncError {
    SyncError::Unsupported {
        target: target.name.clone(),
        platform: target.platform(),
        capability,
        operation,
    }
}

fn outcome(entry: &DiffEntry, error: Option<String>) -> SecretOutcome {
    SecretOutcome {
        name: entry.name.clone(),
        environment: entry.environment.clone(),
        action: entry.kind,
        success: error.is_none(),
        error,
    }
}

fn event(
    target: &Target,
    entry: &DiffEntry,
    phase: ProgressPhase,
    error: Option<String>,
) -> ProgressEvent {
    ProgressEvent {
        phase,
        target: target.name.clone(),
        secret: entry.name.clone(),
        environment: entry.environment.clone(),
        action: entry.kind,
        success: phase == ProgressPhase::Finished && error.is_none(),
        error,
    }
}
