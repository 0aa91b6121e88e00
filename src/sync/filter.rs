//! # Secret Filter
//!
//! Include/exclude glob gates deciding which secret names a target receives.
//! A non-empty include list must match; a matching exclude pattern always
//! rejects. A target with no patterns receives every name.

use crate::model::{SecretFilter, Target};
use tracing::warn;

/// True when `name` matches at least one pattern. Invalid patterns never match.
fn matches_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|pattern| match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(name),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Ignoring invalid secret filter pattern");
            false
        }
    })
}

#[must_use]
pub fn should_sync(name: &str, filter: &SecretFilter) -> bool {
    if !filter.include.is_empty() && !matches_any(&filter.include, name) {
        return false;
    }
    !matches_any(&filter.exclude, name)
}

/// Names from `names` that `target` accepts, in input order
#[must_use]
pub fn filter_secret_names(names: &[String], target: &Target) -> Vec<String> {
    names
        .iter()
        .filter(|name| should_sync(name, &target.filter))
        .cloned()
        .collect()
}
