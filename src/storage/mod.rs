//! Persistence for issues, projects, boards and authentications
//!
//! The sync engine only needs [`IssueStore`]. [`SqliteStore`] implements it
//! together with the credential and backlog-tag lookups.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::model::{IssueRecord, Provider, ProjectRecord};
use crate::Result;

/// Issue persistence with attribute-level updates
pub trait IssueStore {
    fn load_issue(&self, id: i64) -> Result<IssueRecord>;

    fn load_project(&self, id: i64) -> Result<ProjectRecord>;

    /// Insert or update `issue`, assigning its id on first save
    ///
    /// Updates write content only. Remote identifiers already stored win
    /// over whatever `issue` carries and are copied back onto it.
    fn save_issue(&self, issue: &mut IssueRecord) -> Result<i64>;

    /// Record `remote_id` for `provider` only if the issue has none yet.
    ///
    /// Returns `false` when another writer already set an identifier, in
    /// which case the stored value is left alone.
    fn claim_remote_id(&self, issue_id: i64, provider: Provider, remote_id: u64) -> Result<bool>;
}
