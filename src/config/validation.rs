//! Configuration validation
//!
//! Validates IssueBridge configuration for correctness:
//! - Provider API URLs are absolute http(s) URLs
//! - The default GitHub repository has the `owner/name` shape
//! - Bitbucket API version prefixes are present
//! - The request timeout is positive

use super::bridge_config::IssueBridgeConfig;
use crate::IssueBridgeError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate an IssueBridge configuration, collecting every problem
pub fn validate_config(config: &IssueBridgeConfig) -> ValidationResult {
    let mut errors = Vec::new();
    let providers = &config.providers;

    check_url(&mut errors, "github.api_url", &providers.github.api_url);
    check_url(&mut errors, "gitlab.api_url", &providers.gitlab.api_url);
    check_url(&mut errors, "bitbucket.api_url", &providers.bitbucket.api_url);

    let repository = &providers.github.repository;
    let parts: Vec<&str> = repository.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
        errors.push(ValidationError::new(
            "github.repository",
            format!("Expected owner/name, got '{}'", repository),
        ));
    }

    if providers.bitbucket.create_version.trim().is_empty() {
        errors.push(ValidationError::new(
            "bitbucket.create_version",
            "API version prefix must not be empty",
        ));
    }
    if providers.bitbucket.update_version.trim().is_empty() {
        errors.push(ValidationError::new(
            "bitbucket.update_version",
            "API version prefix must not be empty",
        ));
    }

    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "request_timeout_secs",
            "Timeout must be greater than zero",
        ));
    }

    if config.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("user_agent", "User-Agent must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, url: &str) {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        errors.push(ValidationError::new(
            field,
            format!("URL must start with http:// or https://, got '{}'", url),
        ));
    } else if url.ends_with('/') {
        errors.push(ValidationError::new(
            field,
            "URL must not end with a trailing slash",
        ));
    }
}

/// Validate and fold all problems into a single crate error
pub fn validate_config_result(config: &IssueBridgeConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        IssueBridgeError::Config(messages.join("; "))
    })
}
