//! Project record and its per-provider repository coordinates

use serde::{Deserialize, Serialize};

/// A local project and where its issues live on each provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Store-assigned id, `None` until first saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub name: String,

    /// GitHub `owner/name`; falls back to the configured repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repository: Option<String>,

    /// GitLab project path. Empty means a placeholder project.
    #[serde(default)]
    pub gitlab_project: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket_owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket_slug: Option<String>,
}

impl ProjectRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            github_repository: None,
            gitlab_project: String::new(),
            bitbucket_owner: None,
            bitbucket_slug: None,
        }
    }

    pub fn with_github_repository(mut self, repository: impl Into<String>) -> Self {
        self.github_repository = Some(repository.into());
        self
    }

    pub fn with_gitlab_project(mut self, path: impl Into<String>) -> Self {
        self.gitlab_project = path.into();
        self
    }

    pub fn with_bitbucket(mut self, owner: impl Into<String>, slug: impl Into<String>) -> Self {
        self.bitbucket_owner = Some(owner.into());
        self.bitbucket_slug = Some(slug.into());
        self
    }

    /// Bitbucket `(owner, slug)` when both are configured and non-empty
    pub fn bitbucket_repository(&self) -> Option<(&str, &str)> {
        match (self.bitbucket_owner.as_deref(), self.bitbucket_slug.as_deref()) {
            (Some(owner), Some(slug)) if !owner.is_empty() && !slug.is_empty() => {
                Some((owner, slug))
            }
            _ => None,
        }
    }
}
