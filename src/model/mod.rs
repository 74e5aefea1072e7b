//! Data entities
//!
//! Issues, projects, provider authentications and board columns: the state
//! the sync engine reads and the few fields it writes back.

mod auth;
mod board;
mod issue;
mod project;

pub use auth::{AuthenticationRecord, Credentials, Provider};
pub use board::{Board, BoardColumn};
pub use issue::{IssueRecord, IssueState};
pub use project::ProjectRecord;
