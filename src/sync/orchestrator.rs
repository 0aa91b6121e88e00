//! # Orchestrator
//!
//! Drives one sync run over many targets:
//!
//! 1. Authentication pre-flight over every target. Any failure aborts the run
//!    before a single store is touched.
//! 2. For each target, every remote environment mapped to the run's local
//!    environment gets one apply pass (which previews first). Targets without
//!    a mapping are skipped and listed in the report.
//!
//! Passes run sequentially. Under [`ContinuationPolicy::Lenient`] a failed pass
//! is recorded and the run moves on; under [`ContinuationPolicy::Strict`] every
//! later pass is skipped. Cancelling the token marks the in-flight pass
//! cancelled and all passes not yet started as skipped.

use crate::auth::AuthStatus;
use crate::error::SyncError;
use crate::model::{LocalEnvironment, SyncCounts, SyncResult, Target};
use crate::provider::{Platform, PlatformRegistry, StoreFactory};
use crate::source::LocalSource;
use crate::sync::engine::{ApplyOptions, SyncEngine};
use crate::sync::progress::ProgressCallback;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What happens to the remaining passes after one fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContinuationPolicy {
    /// Record the failure and keep going
    #[default]
    Lenient,
    /// Skip every pass after the first failure
    Strict,
}

/// Inputs for one run
#[derive(Clone)]
pub struct SyncRun {
    pub secret_names: Vec<String>,
    pub source: Arc<dyn LocalSource>,
    pub targets: Vec<Target>,
    pub local_env: LocalEnvironment,
    pub dry_run: bool,
    pub policy: ContinuationPolicy,
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for SyncRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRun")
            .field("secret_names", &self.secret_names)
            .field("source", &self.source.describe())
            .field("targets", &self.targets)
            .field("local_env", &self.local_env)
            .field("dry_run", &self.dry_run)
            .field("policy", &self.policy)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl SyncRun {
    #[must_use]
    pub fn new(
        secret_names: Vec<String>,
        source: Arc<dyn LocalSource>,
        targets: Vec<Target>,
        local_env: LocalEnvironment,
    ) -> Self {
        Self {
            secret_names,
            source,
            targets,
            local_env,
            dry_run: false,
            policy: ContinuationPolicy::default(),
            progress: None,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: ContinuationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[derive(Debug)]
pub enum PassOutcome {
    Completed(SyncResult),
    /// The pass could not produce a result (configuration, credentials, remote read, ...)
    Failed(SyncError),
    /// Never started: cancelled run or strict policy after an earlier failure
    Skipped,
    /// Interrupted by cancellation while in flight
    Cancelled,
}

/// One (target, remote environment) pass
#[derive(Debug)]
pub struct PassReport {
    pub target_name: String,
    pub platform: Platform,
    pub project: String,
    pub remote_env: String,
    pub outcome: PassOutcome,
}

impl PassReport {
    /// Failed outright, or completed with at least one failed write
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            PassOutcome::Completed(result) => result.has_failures(),
            PassOutcome::Failed(_) => true,
            PassOutcome::Skipped | PassOutcome::Cancelled => false,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub local_env: LocalEnvironment,
    pub dry_run: bool,
    pub passes: Vec<PassReport>,
    /// Targets with no remote environment mapped to `local_env`
    pub unmapped: Vec<String>,
    /// Sum of completed pass counters
    pub totals: SyncCounts,
}

impl RunReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.passes.iter().any(PassReport::is_failure)
    }

    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.passes
            .iter()
            .any(|p| matches!(p.outcome, PassOutcome::Cancelled))
    }

    /// Number of passes that ended in [`PassOutcome::Failed`]
    #[must_use]
    pub fn failed_passes(&self) -> usize {
        self.passes
            .iter()
            .filter(|p| matches!(p.outcome, PassOutcome::Failed(_)))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator<F: StoreFactory = PlatformRegistry> {
    engine: SyncEngine<F>,
}

impl<F: StoreFactory> Orchestrator<F> {
    #[must_use]
    pub fn new(engine: SyncEngine<F>) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &SyncEngine<F> {
        &self.engine
    }

    /// Check authentication for every target; returns the failures
    #[must_use]
    pub fn preflight(&self, targets: &[Target]) -> Vec<AuthStatus> {
        targets
            .iter()
            .map(|target| self.engine.check_auth(target))
            .filter(|status| !status.authenticated)
            .collect()
    }

    pub async fn run(
        &self,
        run: &SyncRun,
        cancel: &CancellationToken,
    ) -> Result<RunReport, SyncError> {
        let failures = self.preflight(&run.targets);
        if !failures.is_empty() {
            warn!(failed = failures.len(), "Authentication pre-flight failed");
            return Err(SyncError::Authentication { failures });
        }

        let mut report = RunReport {
            local_env: run.local_env,
            dry_run: run.dry_run,
            passes: Vec::new(),
            unmapped: Vec::new(),
            totals: SyncCounts::default(),
        };

        let mut plan: Vec<(&Target, String)> = Vec::new();
        for target in &run.targets {
            let remotes = target.mapping.map_to_remote(run.local_env);
            if remotes.is_empty() {
                info!(target_name = %target.name, local_env = %run.local_env, "No mapping, skipping target");
                report.unmapped.push(target.name.clone());
                continue;
            }
            plan.extend(remotes.into_iter().map(|remote| (target, remote)));
        }

        let options = ApplyOptions {
            dry_run: run.dry_run,
            progress: run.progress.clone(),
        };
        let mut halted = false;

        for (target, remote_env) in plan {
            let outcome = if halted || cancel.is_cancelled() {
                PassOutcome::Skipped
            } else {
                self.pass(run, target, &remote_env, &options, cancel).await
            };

            match &outcome {
                PassOutcome::Completed(result) => {
                    report.totals += result.counts;
                    if result.has_failures() && run.policy == ContinuationPolicy::Strict {
                        halted = true;
                    }
                }
                PassOutcome::Failed(e) => {
                    warn!(target_name = %target.name, environment = %remote_env, error = %e, "Sync pass failed");
                    if run.policy == ContinuationPolicy::Strict {
                        halted = true;
                    }
                }
                PassOutcome::Skipped | PassOutcome::Cancelled => {}
            }

            report.passes.push(PassReport {
                target_name: target.name.clone(),
                platform: target.platform(),
                project: target.project().to_string(),
                remote_env,
                outcome,
            });
        }

        Ok(report)
    }

    async fn pass(
        &self,
        run: &SyncRun,
        target: &Target,
        remote_env: &str,
        options: &ApplyOptions,
        cancel: &CancellationToken,
    ) -> PassOutcome {
        let apply = self.engine.apply(
            &run.secret_names,
            run.source.as_ref(),
            target,
            remote_env,
            options,
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(target_name = %target.name, environment = remote_env, "Sync pass cancelled");
                PassOutcome::Cancelled
            }
            result = apply => match result {
                Ok(result) => PassOutcome::Completed(result),
                Err(e) => PassOutcome::Failed(e),
            },
        }
    }
}
