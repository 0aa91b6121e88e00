//! Plain-text rendering for command output.

use crate::auth::AuthStatus;
use crate::model::{DiffKind, SyncCounts, Target};
use crate::sync::{PassOutcome, PassReport, RunReport};
use std::fmt::Write as _;

/// One line per target for the authentication check
pub fn auth_line(target: &Target, status: &AuthStatus) -> String {
    if status.authenticated {
        if status.platform.is_credential_free() {
            format!("  ✓ {} (local file)", target.name)
        } else if status.platform.uses_sdk_auth() {
            format!("  ✓ {} (SDK credential chain)", target.name)
        } else {
            format!("  ✓ {}", target.name)
        }
    } else {
        let reason = status.error.as_deref().unwrap_or("not authenticated");
        format!("  ✗ {} - {reason}", target.name)
    }
}

/// Auth status column for `status`
pub fn auth_summary(target: &Target, status: &AuthStatus) -> String {
    if status.platform.is_credential_free() {
        return format!("(file: {})", target.project());
    }
    if status.authenticated {
        let via = match (status.source, status.env_var) {
            (Some(crate::auth::CredentialSource::Env), Some(var)) => var.to_string(),
            (Some(source), _) => source.to_string(),
            (None, _) => "unknown".to_string(),
        };
        format!("authenticated (via {via})")
    } else {
        match status.env_var {
            Some(var) => format!("not authenticated - set {var}"),
            None => "not authenticated".to_string(),
        }
    }
}

fn label(kind: DiffKind) -> &'static str {
    match kind {
        DiffKind::Add => "new",
        DiffKind::Change => "changed",
        DiffKind::Unknown => "unknown",
        DiffKind::Remove => "removed",
        DiffKind::Unchanged => "unchanged",
    }
}

/// Header plus body for one pass
pub fn pass(report: &PassReport) -> String {
    let mut out = format!(
        "{} → {}/{}\n",
        report.target_name, report.project, report.remote_env
    );

    match &report.outcome {
        PassOutcome::Completed(result) => {
            if result.diff.has_changes() {
                for entry in result
                    .diff
                    .entries
                    .iter()
                    .filter(|e| e.kind != DiffKind::Unchanged)
                {
                    let _ = writeln!(
                        out,
                        "  {} {} ({})",
                        entry.kind.marker(),
                        entry.name,
                        label(entry.kind)
                    );
                }
            } else {
                out.push_str("  No changes\n");
            }

            if result.dry_run {
                let counts = result.diff.count_by_kind();
                let _ = writeln!(
                    out,
                    "  Would add: {}, change: {}, unknown: {}, unchanged: {}",
                    counts.added, counts.changed, counts.unknown, counts.unchanged
                );
            }
            for error in &result.errors {
                let _ = writeln!(out, "  ✗ {error}");
            }
        }
        PassOutcome::Failed(e) => {
            let _ = writeln!(out, "  ✗ {e}");
        }
        PassOutcome::Skipped => out.push_str("  - skipped\n"),
        PassOutcome::Cancelled => out.push_str("  ! cancelled\n"),
    }

    out
}

/// `Added: n, Changed: n, Unknown: n, Unchanged: n[, Failed: n]`
pub fn counts_line(counts: &SyncCounts, failed: usize) -> String {
    let mut line = format!(
        "Added: {}, Changed: {}, Unknown: {}, Unchanged: {}",
        counts.added, counts.changed, counts.unknown, counts.unchanged
    );
    if failed > 0 {
        let _ = write!(line, ", Failed: {failed}");
    }
    line
}

/// Final line of a sync run
pub fn summary(report: &RunReport) -> String {
    if report.dry_run {
        return "Dry run - no changes applied".to_string();
    }
    let failed = report.totals.failed + report.failed_passes();
    let mark = if failed == 0 { '✓' } else { '!' };
    format!("{mark} {}", counts_line(&report.totals, failed))
}
