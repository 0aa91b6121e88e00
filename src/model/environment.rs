//! # Environments
//!
//! Local environments (`test`, `live`) and the per-target table that maps
//! platform-specific remote environment names onto them.

use crate::constants::DEFAULT_MAPPING_KEY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the two fixed buckets local values are organised under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalEnvironment {
    Test,
    Live,
}

impl LocalEnvironment {
    pub const ALL: [LocalEnvironment; 2] = [LocalEnvironment::Test, LocalEnvironment::Live];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalEnvironment::Test => "test",
            LocalEnvironment::Live => "live",
        }
    }

    /// Conventional env file for this environment (`.env.test`, `.env.live`)
    #[must_use]
    pub fn env_file_name(&self) -> String {
        format!(".env.{}", self.as_str())
    }
}

impl fmt::Display for LocalEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocalEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(LocalEnvironment::Test),
            "live" => Ok(LocalEnvironment::Live),
            other => Err(format!(
                "unknown local environment '{other}' (expected 'test' or 'live')"
            )),
        }
    }
}

/// Remote environment name -> local environment
///
/// Many remote environments may share one local environment. The literal
/// `default` key is the fallback for reverse lookups of unlisted names, which
/// collides with platforms whose real environment is called `default`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMapping(BTreeMap<String, LocalEnvironment>);

impl EnvironmentMapping {
    #[must_use]
    pub fn new(entries: BTreeMap<String, LocalEnvironment>) -> Self {
        Self(entries)
    }

    /// All remote environments mapped to `local`, in name order
    #[must_use]
    pub fn map_to_remote(&self, local: LocalEnvironment) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, mapped)| **mapped == local)
            .map(|(remote, _)| remote.clone())
            .collect()
    }

    /// Local environment for `remote`: exact entry first, then the `default` entry.
    /// `None` means the target is unmapped for this remote environment.
    #[must_use]
    pub fn map_to_local(&self, remote: &str) -> Option<LocalEnvironment> {
        self.0
            .get(remote)
            .or_else(|| self.0.get(DEFAULT_MAPPING_KEY))
            .copied()
    }

    /// Distinct local environments referenced by the table
    #[must_use]
    pub fn local_environments(&self) -> Vec<LocalEnvironment> {
        let mut envs: Vec<LocalEnvironment> = self.0.values().copied().collect();
        envs.sort();
        envs.dedup();
        envs
    }

    #[must_use]
    pub fn remote_environments(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LocalEnvironment)> {
        self.0.iter().map(|(remote, local)| (remote.as_str(), *local))
    }
}

impl<S: Into<String>> FromIterator<(S, LocalEnvironment)> for EnvironmentMapping {
    fn from_iter<I: IntoIterator<Item = (S, LocalEnvironment)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vercel_mapping() -> EnvironmentMapping {
        [
            ("development", LocalEnvironment::Test),
            ("preview", LocalEnvironment::Test),
            ("production", LocalEnvironment::Live),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_map_to_remote_fans_out() {
        let mapping = vercel_mapping();
        assert_eq!(
            mapping.map_to_remote(LocalEnvironment::Test),
            vec!["development".to_string(), "preview".to_string()]
        );
        assert_eq!(
            mapping.map_to_remote(LocalEnvironment::Live),
            vec!["production".to_string()]
        );
    }

    #[test]
    fn test_map_to_local_exact_match() {
        let mapping = vercel_mapping();
        assert_eq!(
            mapping.map_to_local("production"),
            Some(LocalEnvironment::Live)
        );
        assert_eq!(mapping.map_to_local("staging"), None);
    }

    #[test]
    fn test_map_to_local_falls_back_to_default() {
        let mapping: EnvironmentMapping = [
            ("default", LocalEnvironment::Live),
            ("preview", LocalEnvironment::Test),
        ]
        .into_iter()
        .collect();
        assert_eq!(mapping.map_to_local("preview"), Some(LocalEnvironment::Test));
        assert_eq!(mapping.map_to_local("anything"), Some(LocalEnvironment::Live));
    }

    #[test]
    fn test_empty_mapping() {
        let mapping = EnvironmentMapping::default();
        assert!(mapping.map_to_remote(LocalEnvironment::Test).is_empty());
        assert_eq!(mapping.map_to_local("production"), None);
        assert!(mapping.local_environments().is_empty());
    }

    #[test]
    fn test_local_environment_parse() {
        assert_eq!("test".parse(), Ok(LocalEnvironment::Test));
        assert_eq!(" LIVE ".parse(), Ok(LocalEnvironment::Live));
        assert!("staging".parse::<LocalEnvironment>().is_err());
    }

    #[test]
    fn test_mapping_yaml_round_trip_rejects_unknown_local() {
        let ok: EnvironmentMapping =
            serde_yaml::from_str("development: test\nproduction: live\n").unwrap();
        assert_eq!(ok.local_environments().len(), 2);

        let bad = serde_yaml::from_str::<EnvironmentMapping>("development: staging\n");
        assert!(bad.is_err());
    }
}
