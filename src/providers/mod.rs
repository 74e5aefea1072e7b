//! Provider adapters
//!
//! One small configuration struct per external tracker, selected through the
//! [`ProviderAdapter`] enum. Each adapter knows its provider's endpoint
//! layout, auth header, body encoding and response shape:
//!
//! | Provider  | Create                          | Update                               | Body |
//! |-----------|---------------------------------|--------------------------------------|------|
//! | GitHub    | `POST /repos/{repo}/issues`     | `PATCH /repos/{repo}/issues/{n}`     | JSON |
//! | GitLab    | `POST /projects/{p}/issues`     | `PUT /projects/{p}/issues/{id}`      | form |
//! | Bitbucket | `POST /2.0/…/{o}/{s}/issues/`   | `PUT /1.0/…/{o}/{s}/issues/{id}/`    | JSON |
//!
//! GitHub additionally sends a label reconciliation request before every
//! sync.
//!
//! Adapters only build requests and read responses; sending them is the
//! [`crate::transport::Transport`]'s job.

pub mod bitbucket;
pub mod github;
pub mod gitlab;

pub use bitbucket::BitbucketAdapter;
pub use github::GitHubAdapter;
pub use gitlab::GitLabAdapter;

use crate::config::ProvidersConfig;
use crate::model::{Credentials, IssueRecord, Provider, ProjectRecord};
use crate::transport::{HttpRequest, HttpResponse};
use crate::Result;
use serde::Serialize;
use std::fmt;

/// Whether a sync creates the remote issue or updates an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Create,
    /// Update the remote issue with this identifier
    Update(u64),
}

impl SyncMode {
    /// Create when the issue has no identifier for `provider` yet
    pub fn for_issue(issue: &IssueRecord, provider: Provider) -> Self {
        match issue.remote_id(provider) {
            Some(remote_id) => SyncMode::Update(remote_id),
            None => SyncMode::Create,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Create => "create",
            SyncMode::Update(_) => "update",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests for one sync, in send order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Must succeed before `request` is sent
    pub preflight: Option<HttpRequest>,
    pub request: HttpRequest,
}

impl SyncPlan {
    pub fn single(request: HttpRequest) -> Self {
        Self {
            preflight: None,
            request,
        }
    }

    /// All requests in send order
    pub fn requests(&self) -> impl Iterator<Item = &HttpRequest> {
        self.preflight.iter().chain(std::iter::once(&self.request))
    }
}

/// The value a provider reports for a successful sync
///
/// The shape differs per provider and per mode, and callers rely on the
/// exact value:
///
/// - GitHub: create `Bool(true)`, update `Body(raw response)`
/// - GitLab: create `Bool(true)`, update `Bool(false)`
/// - Bitbucket: create `Null`, update `Size(parsed body size)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProviderAck {
    Bool(bool),
    Body(String),
    Null,
    Size(usize),
}

impl fmt::Display for ProviderAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderAck::Bool(value) => write!(f, "{}", value),
            ProviderAck::Body(body) => f.write_str(body),
            ProviderAck::Null => f.write_str("null"),
            ProviderAck::Size(size) => write!(f, "{}", size),
        }
    }
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote issue was created. `remote_id` is `None` when the
    /// provider's response did not carry an identifier.
    Created {
        remote_id: Option<u64>,
        ack: ProviderAck,
    },
    Updated {
        ack: ProviderAck,
    },
}

impl SyncOutcome {
    pub fn ack(&self) -> &ProviderAck {
        match self {
            SyncOutcome::Created { ack, .. } | SyncOutcome::Updated { ack } => ack,
        }
    }

    pub fn into_ack(self) -> ProviderAck {
        match self {
            SyncOutcome::Created { ack, .. } | SyncOutcome::Updated { ack } => ack,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SyncOutcome::Created { .. })
    }
}

/// A provider's adapter, selected by provider identity
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    GitHub(GitHubAdapter),
    GitLab(GitLabAdapter),
    Bitbucket(BitbucketAdapter),
}

impl ProviderAdapter {
    /// Build the adapter for `provider` from endpoint configuration
    pub fn for_provider(provider: Provider, config: &ProvidersConfig, user_agent: &str) -> Self {
        match provider {
            Provider::GitHub => {
                ProviderAdapter::GitHub(GitHubAdapter::new(&config.github, user_agent))
            }
            Provider::GitLab => {
                ProviderAdapter::GitLab(GitLabAdapter::new(&config.gitlab, user_agent))
            }
            Provider::Bitbucket => {
                ProviderAdapter::Bitbucket(BitbucketAdapter::new(&config.bitbucket, user_agent))
            }
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ProviderAdapter::GitHub(_) => Provider::GitHub,
            ProviderAdapter::GitLab(_) => Provider::GitLab,
            ProviderAdapter::Bitbucket(_) => Provider::Bitbucket,
        }
    }

    /// Whether `credentials` carry every secret this provider signs with
    pub fn accepts(&self, credentials: &Credentials) -> bool {
        match self {
            ProviderAdapter::GitLab(_) => credentials
                .private_token
                .as_deref()
                .is_some_and(|t| !t.is_empty()),
            ProviderAdapter::GitHub(_) | ProviderAdapter::Bitbucket(_) => {
                !credentials.token.is_empty()
            }
        }
    }

    pub fn build_plan(
        &self,
        mode: SyncMode,
        issue: &IssueRecord,
        project: &ProjectRecord,
        credentials: &Credentials,
    ) -> Result<SyncPlan> {
        match self {
            ProviderAdapter::GitHub(a) => a.build_plan(mode, issue, project, credentials),
            ProviderAdapter::GitLab(a) => Ok(a.build_plan(mode, issue, project, credentials)),
            ProviderAdapter::Bitbucket(a) => a.build_plan(mode, issue, project, credentials),
        }
    }

    /// Read a successful (2xx) response
    pub fn interpret(&self, mode: SyncMode, response: &HttpResponse) -> Result<SyncOutcome> {
        match self {
            ProviderAdapter::GitHub(a) => Ok(a.interpret(mode, response)),
            ProviderAdapter::GitLab(a) => Ok(a.interpret(mode, response)),
            ProviderAdapter::Bitbucket(a) => a.interpret(mode, response),
        }
    }
}

/// Read an integer identifier from a JSON response body
///
/// Accepts both `{"id": 1}` and `{"id": "1"}`; anything else, including an
/// empty or non-JSON body, yields `None`.
pub(crate) fn remote_id_field(body: &str, field: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get(field)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Tags in request order
pub(crate) fn labels(issue: &IssueRecord) -> Vec<&str> {
    issue.tags.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_remote_id() {
        let mut issue = IssueRecord::new(1, "Some title");
        assert_eq!(SyncMode::for_issue(&issue, Provider::GitHub), SyncMode::Create);

        issue.github_issue_number = Some(1);
        assert_eq!(
            SyncMode::for_issue(&issue, Provider::GitHub),
            SyncMode::Update(1)
        );
        assert_eq!(SyncMode::for_issue(&issue, Provider::GitLab), SyncMode::Create);
    }

    #[test]
    fn test_remote_id_field_shapes() {
        assert_eq!(remote_id_field(r#"{"id":1}"#, "id"), Some(1));
        assert_eq!(remote_id_field(r#"{"id":"1"}"#, "id"), Some(1));
        assert_eq!(remote_id_field(r#"{"number":42}"#, "number"), Some(42));
        assert_eq!(remote_id_field(r#"{"id":"abc"}"#, "id"), None);
        assert_eq!(remote_id_field("{}", "id"), None);
        assert_eq!(remote_id_field("", "id"), None);
    }

    #[test]
    fn test_ack_json_shapes() {
        let render = |ack: ProviderAck| serde_json::to_string(&ack).unwrap();
        assert_eq!(render(ProviderAck::Bool(true)), "true");
        assert_eq!(render(ProviderAck::Body(String::new())), "\"\"");
        assert_eq!(render(ProviderAck::Null), "null");
        assert_eq!(render(ProviderAck::Size(0)), "0");
    }

    #[test]
    fn test_adapter_selection() {
        let config = ProvidersConfig::default();
        for provider in Provider::ALL {
            let adapter = ProviderAdapter::for_provider(provider, &config, "test-agent");
            assert_eq!(adapter.provider(), provider);
        }
    }

    #[test]
    fn test_gitlab_needs_private_token() {
        let config = ProvidersConfig::default();
        let gitlab = ProviderAdapter::for_provider(Provider::GitLab, &config, "ua");
        let github = ProviderAdapter::for_provider(Provider::GitHub, &config, "ua");

        let plain = Credentials::new("token");
        assert!(!gitlab.accepts(&plain));
        assert!(github.accepts(&plain));
        assert!(gitlab.accepts(&plain.with_private_token("private")));
    }
}
