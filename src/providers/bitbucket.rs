//! Bitbucket Issues adapter
//!
//! Issues are created through the 2.0 API and updated through the 1.0 API;
//! both prefixes come from configuration and stay distinct.

use super::{remote_id_field, ProviderAck, SyncMode, SyncOutcome, SyncPlan};
use crate::config::BitbucketSettings;
use crate::model::{Credentials, IssueRecord, Provider, ProjectRecord};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse};
use crate::{IssueBridgeError, Result};
use serde::Serialize;

/// Bitbucket endpoint and header settings
#[derive(Debug, Clone)]
pub struct BitbucketAdapter {
    api_url: String,
    create_version: String,
    update_version: String,
    user_agent: String,
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    title: &'a str,
    content: Option<&'a str>,
}

impl BitbucketAdapter {
    pub fn new(settings: &BitbucketSettings, user_agent: &str) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            create_version: settings.create_version.trim_matches('/').to_string(),
            update_version: settings.update_version.trim_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    fn issues_url(&self, version: &str, owner: &str, slug: &str) -> String {
        format!(
            "{}/{}/repositories/{}/{}/issues/",
            self.api_url,
            version,
            urlencoding::encode(owner),
            urlencoding::encode(slug)
        )
    }

    pub fn build_plan(
        &self,
        mode: SyncMode,
        issue: &IssueRecord,
        project: &ProjectRecord,
        credentials: &Credentials,
    ) -> Result<SyncPlan> {
        let (owner, slug) =
            project
                .bitbucket_repository()
                .ok_or(IssueBridgeError::ProjectNotLinked {
                    project_id: project.id.unwrap_or_default(),
                    provider: Provider::Bitbucket,
                })?;

        let (method, url, body) = match mode {
            SyncMode::Create => (
                HttpMethod::Post,
                self.issues_url(&self.create_version, owner, slug),
                serde_json::to_string(&CreatePayload {
                    title: &issue.title,
                })?,
            ),
            SyncMode::Update(id) => (
                HttpMethod::Put,
                format!(
                    "{}{}/",
                    self.issues_url(&self.update_version, owner, slug),
                    id
                ),
                serde_json::to_string(&UpdatePayload {
                    title: &issue.title,
                    content: issue.body.as_deref(),
                })?,
            ),
        };

        let request = HttpRequest::new(method, url)
            .header("Accept", "*/*")
            .header("Authorization", format!("Bearer {}", credentials.token))
            .header("Content-Type", "application/json")
            .header("User-Agent", self.user_agent.as_str())
            .body(body);

        Ok(SyncPlan::single(request))
    }

    /// Create reports nothing; update reports the size of the parsed
    /// response body.
    pub fn interpret(&self, mode: SyncMode, response: &HttpResponse) -> Result<SyncOutcome> {
        match mode {
            SyncMode::Create => Ok(SyncOutcome::Created {
                remote_id: remote_id_field(&response.body, "id"),
                ack: ProviderAck::Null,
            }),
            SyncMode::Update(_) => Ok(SyncOutcome::Updated {
                ack: ProviderAck::Size(body_size(&response.body)?),
            }),
        }
    }
}

/// Size of a parsed JSON body: key count for objects, length for arrays and
/// strings, zero for an empty body or `null`.
fn body_size(body: &str) -> Result<usize> {
    if body.trim().is_empty() {
        return Ok(0);
    }

    let size = match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::Object(map) => map.len(),
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::String(s) => s.len(),
        serde_json::Value::Null => 0,
        other => other.to_string().len(),
    };
    Ok(size)
}
