//! # Targets
//!
//! A target is one configured sync destination: a platform instance with its
//! typed configuration, an environment mapping, and a secret-name filter.

use crate::model::environment::EnvironmentMapping;
use crate::provider::Platform;
use serde::{Deserialize, Serialize};

/// Include/exclude glob patterns restricting which secret names a target receives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Local `.env` file configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotenvConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Vercel project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VercelConfig {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Convex deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvexConfig {
    pub deployment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_key: Option<String>,
}

/// Fly.io application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyioConfig {
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Railway project configuration; `service_id` scopes variables to one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailwayConfig {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Netlify account configuration; `site_id` scopes variables to one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlifyConfig {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Render service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// AWS Secrets Manager configuration. All secrets live as one JSON object in
/// `secret_name`; credentials come from the AWS SDK chain (optionally `profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSecretsManagerConfig {
    pub region: String,
    pub secret_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Platform-specific target configuration, tagged by `type` in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlatformConfig {
    Dotenv(DotenvConfig),
    Vercel(VercelConfig),
    Convex(ConvexConfig),
    Flyio(FlyioConfig),
    Railway(RailwayConfig),
    Netlify(NetlifyConfig),
    Render(RenderConfig),
    #[serde(rename = "aws-secretsmanager")]
    AwsSecretsManager(AwsSecretsManagerConfig),
}

impl PlatformConfig {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            PlatformConfig::Dotenv(_) => Platform::Dotenv,
            PlatformConfig::Vercel(_) => Platform::Vercel,
            PlatformConfig::Convex(_) => Platform::Convex,
            PlatformConfig::Flyio(_) => Platform::Flyio,
            PlatformConfig::Railway(_) => Platform::Railway,
            PlatformConfig::Netlify(_) => Platform::Netlify,
            PlatformConfig::Render(_) => Platform::Render,
            PlatformConfig::AwsSecretsManager(_) => Platform::AwsSecretsManager,
        }
    }

    /// Project/deployment label shown next to the target name
    #[must_use]
    pub fn project_label(&self) -> &str {
        match self {
            PlatformConfig::Dotenv(c) => c
                .path
                .as_deref()
                .unwrap_or(crate::constants::DEFAULT_DOTENV_PATH),
            PlatformConfig::Vercel(c) => &c.project,
            PlatformConfig::Convex(c) => &c.deployment,
            PlatformConfig::Flyio(c) => &c.app_name,
            PlatformConfig::Railway(c) => &c.project_id,
            PlatformConfig::Netlify(c) => c.site_id.as_deref().unwrap_or(&c.account_id),
            PlatformConfig::Render(c) => &c.service_id,
            PlatformConfig::AwsSecretsManager(c) => &c.secret_name,
        }
    }

    /// Inline credential fields as `(field, value)` pairs, in lookup order
    #[must_use]
    pub fn inline_credentials(&self) -> Vec<(&'static str, &str)> {
        let mut found = Vec::new();
        match self {
            PlatformConfig::Dotenv(_) | PlatformConfig::AwsSecretsManager(_) => {}
            PlatformConfig::Vercel(VercelConfig { token, .. })
            | PlatformConfig::Railway(RailwayConfig { token, .. })
            | PlatformConfig::Netlify(NetlifyConfig { token, .. })
            | PlatformConfig::Render(RenderConfig { token, .. }) => {
                if let Some(token) = token.as_deref() {
                    found.push(("token", token));
                }
            }
            PlatformConfig::Convex(c) => {
                if let Some(key) = c.deploy_key.as_deref() {
                    found.push(("deploy_key", key));
                }
            }
            PlatformConfig::Flyio(c) => {
                if let Some(token) = c.token.as_deref() {
                    found.push(("token", token));
                }
                if let Some(key) = c.api_key.as_deref() {
                    found.push(("api_key", key));
                }
            }
        }
        found
    }
}

/// A named sync destination, immutable for the duration of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub config: PlatformConfig,
    pub mapping: EnvironmentMapping,
    pub filter: SecretFilter,
}

impl Target {
    #[must_use]
    pub fn new(name: impl Into<String>, config: PlatformConfig, mapping: EnvironmentMapping) -> Self {
        Self {
            name: name.into(),
            config,
            mapping,
            filter: SecretFilter::default(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, include: &[&str], exclude: &[&str]) -> Self {
        self.filter = SecretFilter {
            include: include.iter().map(|p| (*p).to_string()).collect(),
            exclude: exclude.iter().map(|p| (*p).to_string()).collect(),
        };
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.config.platform()
    }

    #[must_use]
    pub fn project(&self) -> &str {
        self.config.project_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_config_tagged_by_type() {
        let yaml = "type: vercel\nproject: prj_1\nteam_id: team_2\n";
        let config: PlatformConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.platform(), Platform::Vercel);
        assert_eq!(config.project_label(), "prj_1");
    }

    #[test]
    fn test_platform_config_missing_required_field() {
        let yaml = "type: convex\n";
        assert!(serde_yaml::from_str::<PlatformConfig>(yaml).is_err());
    }

    #[test]
    fn test_platform_config_unknown_type() {
        let yaml = "type: heroku\napp: x\n";
        assert!(serde_yaml::from_str::<PlatformConfig>(yaml).is_err());
    }

    #[test]
    fn test_dotenv_project_label_defaults_to_dot_env() {
        let config = PlatformConfig::Dotenv(DotenvConfig::default());
        assert_eq!(config.project_label(), ".env");
    }

    #[test]
    fn test_aws_config_uses_hyphenated_type() {
        let yaml = "type: aws-secretsmanager\nregion: eu-west-1\nsecret_name: myapp/dev\n";
        let config: PlatformConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.platform(), Platform::AwsSecretsManager);
        assert_eq!(config.project_label(), "myapp/dev");
        assert!(config.inline_credentials().is_empty());
    }

    #[test]
    fn test_netlify_label_prefers_site() {
        let yaml = "type: netlify\naccount_id: acct\nsite_id: site_1\ntoken: t\n";
        let config: PlatformConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.project_label(), "site_1");
        assert_eq!(config.inline_credentials(), vec![("token", "t")]);
    }

    #[test]
    fn test_inline_credentials_order() {
        let config = PlatformConfig::Flyio(FlyioConfig {
            app_name: "app".to_string(),
            token: Some("t".to_string()),
            api_key: Some("k".to_string()),
        });
        assert_eq!(
            config.inline_credentials(),
            vec![("token", "t"), ("api_key", "k")]
        );
    }
}
