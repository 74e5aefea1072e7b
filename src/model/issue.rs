//! Local issue record

use super::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Open/closed state of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(IssueState::Open),
            "closed" => Ok(IssueState::Closed),
            other => Err(format!("Unknown issue state '{}'", other)),
        }
    }
}

/// A locally tracked issue
///
/// Tags are kept sorted so that requests built from the same content are
/// byte-for-byte identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Store-assigned id, `None` until first saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub state: IssueState,

    /// Owning project
    pub project_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_issue_number: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_issue_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket_issue_id: Option<u64>,
}

impl IssueRecord {
    /// Create an unsaved, open, untagged issue
    pub fn new(project_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: None,
            tags: BTreeSet::new(),
            state: IssueState::Open,
            project_id,
            github_issue_number: None,
            gitlab_issue_id: None,
            bitbucket_issue_id: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_state(mut self, state: IssueState) -> Self {
        self.state = state;
        self
    }

    /// Remote identifier for `provider`, if the issue was created there
    pub fn remote_id(&self, provider: Provider) -> Option<u64> {
        match provider {
            Provider::GitHub => self.github_issue_number,
            Provider::GitLab => self.gitlab_issue_id,
            Provider::Bitbucket => self.bitbucket_issue_id,
        }
    }

    pub fn set_remote_id(&mut self, provider: Provider, remote_id: Option<u64>) {
        match provider {
            Provider::GitHub => self.github_issue_number = remote_id,
            Provider::GitLab => self.gitlab_issue_id = remote_id,
            Provider::Bitbucket => self.bitbucket_issue_id = remote_id,
        }
    }
}
