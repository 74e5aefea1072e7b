//! Provider identity and stored authentications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External issue tracker a local issue can be mirrored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
    Bitbucket,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::GitHub, Provider::GitLab, Provider::Bitbucket];

    /// Name used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::GitHub => "github",
            Provider::GitLab => "gitlab",
            Provider::Bitbucket => "bitbucket",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(Provider::GitHub),
            "gitlab" => Ok(Provider::GitLab),
            "bitbucket" => Ok(Provider::Bitbucket),
            other => Err(format!(
                "Unknown provider '{}' (expected github, gitlab or bitbucket)",
                other
            )),
        }
    }
}

/// A user's stored authentication for one provider
///
/// Lookup is by `(user_id, provider)`; a user holds at most one record per
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRecord {
    /// Local user the record belongs to
    pub user_id: String,

    /// Account id on the provider side
    pub uid: String,

    pub provider: Provider,

    /// OAuth access token
    pub token: String,

    /// GitLab personal private token, sent as the `Private-Token` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_private_token: Option<String>,
}

impl AuthenticationRecord {
    pub fn new(
        user_id: impl Into<String>,
        uid: impl Into<String>,
        provider: Provider,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            uid: uid.into(),
            provider,
            token: token.into(),
            gitlab_private_token: None,
        }
    }

    pub fn with_gitlab_private_token(mut self, token: impl Into<String>) -> Self {
        self.gitlab_private_token = Some(token.into());
        self
    }

    /// The secrets an adapter needs to sign requests
    pub fn credentials(&self) -> Credentials {
        Credentials {
            token: self.token.clone(),
            private_token: self.gitlab_private_token.clone(),
        }
    }
}

/// Resolved secrets for one sync call
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub private_token: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            private_token: None,
        }
    }

    pub fn with_private_token(mut self, token: impl Into<String>) -> Self {
        self.private_token = Some(token.into());
        self
    }
}

// Keep secrets out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field(
                "private_token",
                &self.private_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
