//! Default tags for untagged issues
//!
//! When an issue without tags is saved, it picks up the tags of its
//! project's backlog column, if the project's board has one.

use crate::model::IssueRecord;
use crate::storage::IssueStore;
use crate::Result;
use std::collections::BTreeSet;
use tracing::debug;

/// Read-only lookup of a project's backlog column tags
pub trait BacklogTagSource {
    /// Tags of the project's default backlog column, or `None` when no
    /// board column is flagged as backlog
    fn find_default_backlog_tags(&self, project_id: i64) -> Result<Option<BTreeSet<String>>>;
}

/// Assigns backlog tags to untagged issues
pub struct TagAssignmentRule<'a> {
    source: &'a dyn BacklogTagSource,
}

impl<'a> TagAssignmentRule<'a> {
    pub fn new(source: &'a dyn BacklogTagSource) -> Self {
        Self { source }
    }

    /// Apply the rule to `issue`. Returns whether the tags were assigned.
    ///
    /// Issues that already have tags are left untouched, so applying the
    /// rule again is a no-op.
    pub fn apply(&self, issue: &mut IssueRecord) -> Result<bool> {
        if !issue.tags.is_empty() {
            return Ok(false);
        }

        match self.source.find_default_backlog_tags(issue.project_id)? {
            Some(tags) => {
                debug!(
                    project_id = issue.project_id,
                    tags = tags.len(),
                    "Assigning backlog column tags"
                );
                issue.tags = tags;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Save path for issues: apply the tag rule, then persist
pub fn save_issue(
    store: &dyn IssueStore,
    rule: &TagAssignmentRule<'_>,
    issue: &mut IssueRecord,
) -> Result<i64> {
    rule.apply(issue)?;
    store.save_issue(issue)
}
