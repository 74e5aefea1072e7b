//! GitLab Issues adapter
//!
//! Form-encoded requests against the project-scoped issues API,
//! authenticated with the user's private token.

use super::{remote_id_field, ProviderAck, SyncMode, SyncOutcome, SyncPlan};
use crate::config::GitLabSettings;
use crate::model::{Credentials, IssueRecord, ProjectRecord};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse};
use tracing::warn;

/// GitLab endpoint and header settings
#[derive(Debug, Clone)]
pub struct GitLabAdapter {
    api_url: String,
    user_agent: String,
}

impl GitLabAdapter {
    pub fn new(settings: &GitLabSettings, user_agent: &str) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Issues collection of the project. The path is percent-encoded so
    /// `group/project` addresses a single project; an empty path is kept
    /// empty.
    fn issues_url(&self, project: &ProjectRecord) -> String {
        format!(
            "{}/projects/{}/issues",
            self.api_url,
            urlencoding::encode(&project.gitlab_project)
        )
    }

    /// `title=…&description=…&labels=…`, percent-encoded
    pub fn form_body(issue: &IssueRecord) -> String {
        let labels = issue
            .tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let fields = [
            ("title", issue.title.as_str()),
            ("description", issue.body.as_deref().unwrap_or("")),
            ("labels", labels.as_str()),
        ];

        fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn build_plan(
        &self,
        mode: SyncMode,
        issue: &IssueRecord,
        project: &ProjectRecord,
        credentials: &Credentials,
    ) -> SyncPlan {
        let (method, url) = match mode {
            SyncMode::Create => (HttpMethod::Post, self.issues_url(project)),
            SyncMode::Update(id) => (
                HttpMethod::Put,
                format!("{}/{}", self.issues_url(project), id),
            ),
        };

        let request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .header(
                "Private-Token",
                credentials.private_token.as_deref().unwrap_or_default(),
            )
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", self.user_agent.as_str())
            .body(Self::form_body(issue));

        SyncPlan::single(request)
    }

    /// Create reports `true` and stores the returned `id`; update reports
    /// `false`.
    pub fn interpret(&self, mode: SyncMode, response: &HttpResponse) -> SyncOutcome {
        match mode {
            SyncMode::Create => {
                let remote_id = remote_id_field(&response.body, "id");
                if remote_id.is_none() {
                    warn!("GitLab create response carried no issue id");
                }
                SyncOutcome::Created {
                    remote_id,
                    ack: ProviderAck::Bool(true),
                }
            }
            SyncMode::Update(_) => SyncOutcome::Updated {
                ack: ProviderAck::Bool(false),
            },
        }
    }
}
