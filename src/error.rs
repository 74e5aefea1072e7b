//! Error types for IssueBridge
//!
//! Defines the error enum covering every failure mode of a sync, plus the
//! ambient storage/config failures around it. Uses thiserror for ergonomic
//! error handling.

use crate::model::Provider;
use thiserror::Error;

/// Result type alias for IssueBridge operations
pub type Result<T> = std::result::Result<T, IssueBridgeError>;

/// Comprehensive error type for IssueBridge operations
#[derive(Error, Debug)]
pub enum IssueBridgeError {
    /// No stored credentials for the user/provider pair. Raised before any
    /// request is sent.
    #[error("No {provider} authentication found for user {user_id}")]
    AuthenticationMissing { user_id: String, provider: Provider },

    /// Network or connection failure while talking to a provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("{provider} rejected request: HTTP {status}: {body}")]
    ProviderRejected {
        provider: Provider,
        status: u16,
        body: String,
    },

    /// Project lacks the repository coordinates a provider needs
    #[error("Project {project_id} is not linked to a {provider} repository")]
    ProjectNotLinked { project_id: i64, provider: Provider },

    /// Issue not found
    #[error("Issue not found: {0}")]
    IssueNotFound(i64),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(i64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl IssueBridgeError {
    /// HTTP status carried by a provider rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            IssueBridgeError::ProviderRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl crate::retry::RetryableError for IssueBridgeError {
    fn retry_decision(&self) -> crate::retry::RetryDecision {
        use crate::retry::RetryDecision;
        use std::time::Duration;

        match self {
            IssueBridgeError::Transport(_) => RetryDecision::Retry,
            IssueBridgeError::ProviderRejected { status, .. } => match status {
                429 => RetryDecision::RetryAfter(Duration::from_secs(60)),
                500..=599 => RetryDecision::Retry,
                _ => RetryDecision::NoRetry,
            },
            IssueBridgeError::AuthenticationMissing { .. } => RetryDecision::NoRetry,
            IssueBridgeError::ProjectNotLinked { .. } => RetryDecision::NoRetry,
            IssueBridgeError::IssueNotFound(_) => RetryDecision::NoRetry,
            IssueBridgeError::ProjectNotFound(_) => RetryDecision::NoRetry,
            IssueBridgeError::Config(_) => RetryDecision::NoRetry,
            IssueBridgeError::Storage(_) => RetryDecision::NoRetry,
            IssueBridgeError::Io(_) => RetryDecision::NoRetry,
            IssueBridgeError::Json(_) => RetryDecision::NoRetry,
            IssueBridgeError::Yaml(_) => RetryDecision::NoRetry,
            IssueBridgeError::Database(_) => RetryDecision::NoRetry,
            IssueBridgeError::Http(_) => RetryDecision::NoRetry,
            IssueBridgeError::Other(_) => RetryDecision::NoRetry,
        }
    }
}
