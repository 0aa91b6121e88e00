//! # Local Sources
//!
//! Where local secret values come from: an env file, the process environment,
//! or a combination. All of them answer the same name -> value lookup.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod dotenv;

/// Name -> value lookup over local secret values
pub trait LocalSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Values for `names`; names without a value are simply absent
    fn get_all(&self, names: &[String]) -> BTreeMap<String, String> {
        names
            .iter()
            .filter_map(|name| self.get(name).map(|value| (name.clone(), value)))
            .collect()
    }

    /// Human-readable label for output (`environment`, a file path, ...)
    fn describe(&self) -> String;
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Values from process environment variables
#[derive(Clone)]
pub struct EnvSource {
    lookup: EnvLookup,
}

impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSource {
    #[must_use]
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Use a custom variable lookup instead of the process environment
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl LocalSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.is_empty())
    }

    fn describe(&self) -> String {
        "environment".to_string()
    }
}

/// Values parsed once from an env file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSource {
    /// Read and parse `path`. A missing or unreadable file is an error here,
    /// not an empty source.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = dotenv::read_env_file(&path).await?;
        Ok(Self { path, values })
    }

    /// Build from already-loaded content; `path` is used for labelling only
    #[must_use]
    pub fn from_content(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            values: dotenv::parse_env(content),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry in the file, including names outside the schema
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl LocalSource for FileSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Several sources consulted in order; the first non-empty value wins
pub struct CombinedSource {
    sources: Vec<Box<dyn LocalSource>>,
}

impl CombinedSource {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn LocalSource>>) -> Self {
        Self { sources }
    }
}

impl std::fmt::Debug for CombinedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedSource")
            .field("sources", &self.describe())
            .finish()
    }
}

impl LocalSource for CombinedSource {
    fn get(&self, name: &str) -> Option<String> {
        self.sources
            .iter()
            .filter_map(|source| source.get(name))
            .find(|value| !value.is_empty())
    }

    fn describe(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// In-memory values, mostly useful for tests and previews
impl LocalSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_env_source_omits_empty_values() {
        let vars: HashMap<&str, &str> = [("SET", "value"), ("EMPTY", "")].into_iter().collect();
        let source = EnvSource::with_lookup(move |name| vars.get(name).map(|v| (*v).to_string()));

        let values = source.get_all(&names(&["SET", "EMPTY", "MISSING"]));
        assert_eq!(values.len(), 1);
        assert_eq!(values["SET"], "value");
        assert_eq!(source.describe(), "environment");
    }

    #[test]
    fn test_file_source_lookup() {
        let source = FileSource::from_content(".env.test", "A=1\nB=\nC=3\n");
        let values = source.get_all(&names(&["A", "B", "Z"]));
        assert_eq!(values.get("A").map(String::as_str), Some("1"));
        assert_eq!(values.get("B").map(String::as_str), Some(""));
        assert!(!values.contains_key("Z"));
        assert_eq!(source.describe(), ".env.test");
    }

    #[test]
    fn test_combined_source_first_non_empty_wins() {
        let file = FileSource::from_content(".env", "A=from-file\nB=\n");
        let env = EnvSource::with_lookup(|name| match name {
            "A" => Some("from-env".to_string()),
            "B" => Some("env-b".to_string()),
            _ => None,
        });
        let combined = CombinedSource::new(vec![Box::new(file), Box::new(env)]);

        assert_eq!(combined.get("A").as_deref(), Some("from-file"));
        assert_eq!(combined.get("B").as_deref(), Some("env-b"));
        assert_eq!(combined.get("C"), None);
        assert_eq!(combined.describe(), ".env + environment");
    }

    #[tokio::test]
    async fn test_file_source_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::open(dir.path().join(".env.live")).await.unwrap_err();
        assert!(err.to_string().contains(".env.live"));
    }
}
