//! IssueBridge configuration file handling
//!
//! Loads and manages ~/.config/issuebridge/config.yaml.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// GitHub endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// REST API root
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// `owner/name` used for projects without their own GitHub repository
    #[serde(default = "default_github_repository")]
    pub repository: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_repository() -> String {
    "some/project".to_string()
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            repository: default_github_repository(),
        }
    }
}

/// GitLab endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitLabSettings {
    /// API root including the version segment
    #[serde(default = "default_gitlab_api_url")]
    pub api_url: String,
}

fn default_gitlab_api_url() -> String {
    "https://gitlab.com/api/v3".to_string()
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            api_url: default_gitlab_api_url(),
        }
    }
}

/// Bitbucket endpoint settings
///
/// Issues are created through one API version and updated through another,
/// so both prefixes are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitbucketSettings {
    /// API host root, without a version segment
    #[serde(default = "default_bitbucket_api_url")]
    pub api_url: String,

    #[serde(default = "default_bitbucket_create_version")]
    pub create_version: String,

    #[serde(default = "default_bitbucket_update_version")]
    pub update_version: String,
}

fn default_bitbucket_api_url() -> String {
    "https://api.bitbucket.org".to_string()
}

fn default_bitbucket_create_version() -> String {
    "2.0".to_string()
}

fn default_bitbucket_update_version() -> String {
    "1.0".to_string()
}

impl Default for BitbucketSettings {
    fn default() -> Self {
        Self {
            api_url: default_bitbucket_api_url(),
            create_version: default_bitbucket_create_version(),
            update_version: default_bitbucket_update_version(),
        }
    }
}

/// Endpoint settings for every provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub gitlab: GitLabSettings,

    #[serde(default)]
    pub bitbucket: BitbucketSettings,
}

/// IssueBridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueBridgeConfig {
    /// SQLite database holding issues, projects, boards and authentications
    #[serde(default = "default_database_path")]
    pub database: PathBuf,

    /// User-Agent sent to every provider
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(flatten)]
    pub providers: ProvidersConfig,
}

fn default_database_path() -> PathBuf {
    config_dir().join("issuebridge.db")
}

fn default_user_agent() -> String {
    concat!("issuebridge/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// ~/.config/issuebridge, on every platform
fn config_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("issuebridge");
    path
}

impl IssueBridgeConfig {
    pub fn new() -> Self {
        Self {
            database: default_database_path(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            providers: ProvidersConfig::default(),
        }
    }

    /// Load configuration from the default path, falling back to defaults
    /// when no file exists yet
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::new())
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::IssueBridgeError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading IssueBridge configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            database = %config.database.display(),
            timeout_secs = config.request_timeout_secs,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving IssueBridge configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/issuebridge/config.yaml)
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IssueBridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
