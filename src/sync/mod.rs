//! Local → remote issue synchronization
//!
//! # Sync Flow
//!
//! Each call handles one issue and one provider:
//!
//! 1. **Credentials**: resolve the user's authentication for the provider
//! 2. **Mode**: create when the issue has no remote identifier, else update
//! 3. **Plan**: the provider adapter builds the request(s)
//! 4. **Send**: one attempt, preflight first; any non-2xx aborts
//! 5. **Record**: a create's returned identifier is written to the issue

mod engine;

pub use engine::SyncEngine;

use crate::model::{Credentials, Provider};
use crate::Result;

/// Looks up stored provider credentials for a user
pub trait CredentialResolver {
    /// `Ok(None)` when the user has no authentication for `provider`
    fn resolve(&self, user_id: &str, provider: Provider) -> Result<Option<Credentials>>;
}
