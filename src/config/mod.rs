//! Configuration system
//!
//! Loads ~/.config/issuebridge/config.yaml with support for:
//! - Provider API roots (for self-hosted instances and tests)
//! - The default GitHub repository
//! - Bitbucket's per-operation API versions
//! - Database location, User-Agent and request timeout

mod bridge_config;
pub mod validation;

pub use bridge_config::{
    BitbucketSettings, GitHubSettings, GitLabSettings, IssueBridgeConfig, ProvidersConfig,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
