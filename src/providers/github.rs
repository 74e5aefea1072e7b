//! GitHub Issues adapter
//!
//! Pushes a local issue to a GitHub repository over the REST v3 API.
//! Every sync first reconciles labels, then creates or updates the issue.

use super::{labels, remote_id_field, ProviderAck, SyncMode, SyncOutcome, SyncPlan};
use crate::config::GitHubSettings;
use crate::model::{Credentials, IssueRecord, ProjectRecord};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse};
use crate::Result;
use serde::Serialize;
use tracing::warn;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub endpoint and header settings
#[derive(Debug, Clone)]
pub struct GitHubAdapter {
    api_url: String,
    default_repository: String,
    user_agent: String,
}

#[derive(Debug, Serialize)]
struct LabelsPayload<'a> {
    labels: Vec<&'a str>,
}

// Field order is part of the wire contract.
#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    labels: Vec<&'a str>,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    title: &'a str,
    body: Option<&'a str>,
    labels: Vec<&'a str>,
    state: &'a str,
}

impl GitHubAdapter {
    pub fn new(settings: &GitHubSettings, user_agent: &str) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            default_repository: settings.repository.clone(),
            user_agent: user_agent.to_string(),
        }
    }

    /// The project's repository, or the configured default
    pub fn repository<'a>(&'a self, project: &'a ProjectRecord) -> &'a str {
        project
            .github_repository
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.default_repository)
    }

    fn issues_url(&self, project: &ProjectRecord) -> String {
        format!("{}/repos/{}/issues", self.api_url, self.repository(project))
    }

    fn request(&self, method: HttpMethod, url: String, credentials: &Credentials) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("Accept", ACCEPT)
            .header("Authorization", format!("token {}", credentials.token))
            .header("Content-Type", "application/json")
            .header("User-Agent", self.user_agent.as_str())
    }

    /// Label reconciliation request, sent before every create or update
    ///
    /// Targets the issues collection with a trailing slash and no issue
    /// number, in both modes.
    pub fn label_request(
        &self,
        issue: &IssueRecord,
        project: &ProjectRecord,
        credentials: &Credentials,
    ) -> Result<HttpRequest> {
        let payload = LabelsPayload {
            labels: labels(issue),
        };
        Ok(self
            .request(
                HttpMethod::Patch,
                format!("{}/", self.issues_url(project)),
                credentials,
            )
            .body(serde_json::to_string(&payload)?))
    }

    pub fn build_plan(
        &self,
        mode: SyncMode,
        issue: &IssueRecord,
        project: &ProjectRecord,
        credentials: &Credentials,
    ) -> Result<SyncPlan> {
        let request = match mode {
            SyncMode::Create => {
                let payload = CreatePayload {
                    labels: labels(issue),
                    title: &issue.title,
                };
                self.request(HttpMethod::Post, self.issues_url(project), credentials)
                    .body(serde_json::to_string(&payload)?)
            }
            SyncMode::Update(number) => {
                let payload = UpdatePayload {
                    title: &issue.title,
                    body: issue.body.as_deref(),
                    labels: labels(issue),
                    state: issue.state.as_str(),
                };
                self.request(
                    HttpMethod::Patch,
                    format!("{}/{}", self.issues_url(project), number),
                    credentials,
                )
                .body(serde_json::to_string(&payload)?)
            }
        };

        Ok(SyncPlan {
            preflight: Some(self.label_request(issue, project, credentials)?),
            request,
        })
    }

    /// Create reports `true` and the new issue number; update reports the
    /// raw response body.
    pub fn interpret(&self, mode: SyncMode, response: &HttpResponse) -> SyncOutcome {
        match mode {
            SyncMode::Create => {
                let remote_id = remote_id_field(&response.body, "number");
                if remote_id.is_none() {
                    warn!("GitHub create response carried no issue number");
                }
                SyncOutcome::Created {
                    remote_id,
                    ack: ProviderAck::Bool(true),
                }
            }
            SyncMode::Update(_) => SyncOutcome::Updated {
                ack: ProviderAck::Body(response.body.clone()),
            },
        }
    }
}
