//! Create-or-update reconciliation against a single provider

use super::CredentialResolver;
use crate::config::{IssueBridgeConfig, ProvidersConfig};
use crate::model::{IssueRecord, Provider};
use crate::providers::{ProviderAdapter, SyncMode, SyncOutcome};
use crate::storage::IssueStore;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::{IssueBridgeError, Result};
use tracing::{debug, info, warn};

/// Pushes local issues to GitHub, GitLab and Bitbucket
///
/// Every call is a single attempt; retrying belongs to the caller (see
/// [`crate::retry`]).
pub struct SyncEngine<'a> {
    providers: ProvidersConfig,
    user_agent: String,
    credentials: &'a dyn CredentialResolver,
    transport: &'a dyn Transport,
    store: &'a dyn IssueStore,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        config: &IssueBridgeConfig,
        credentials: &'a dyn CredentialResolver,
        transport: &'a dyn Transport,
        store: &'a dyn IssueStore,
    ) -> Self {
        Self {
            providers: config.providers.clone(),
            user_agent: config.user_agent.clone(),
            credentials,
            transport,
            store,
        }
    }

    /// The adapter this engine uses for `provider`
    pub fn adapter(&self, provider: Provider) -> ProviderAdapter {
        ProviderAdapter::for_provider(provider, &self.providers, &self.user_agent)
    }

    /// Sync to GitHub. Reports `true` on create and the raw response body
    /// on update.
    pub async fn sync_with_github(
        &self,
        issue: &mut IssueRecord,
        user_id: &str,
    ) -> Result<SyncOutcome> {
        self.sync(Provider::GitHub, issue, user_id).await
    }

    /// Sync to GitLab. Reports `true` on create and `false` on update.
    pub async fn sync_with_gitlab(
        &self,
        issue: &mut IssueRecord,
        user_id: &str,
    ) -> Result<SyncOutcome> {
        self.sync(Provider::GitLab, issue, user_id).await
    }

    /// Sync to Bitbucket. Reports null on create and the response body's
    /// size on update.
    pub async fn sync_with_bitbucket(
        &self,
        issue: &mut IssueRecord,
        user_id: &str,
    ) -> Result<SyncOutcome> {
        self.sync(Provider::Bitbucket, issue, user_id).await
    }

    /// Create or update `issue` on `provider` using `user_id`'s credentials
    pub async fn sync(
        &self,
        provider: Provider,
        issue: &mut IssueRecord,
        user_id: &str,
    ) -> Result<SyncOutcome> {
        let adapter = self.adapter(provider);

        let credentials = self
            .credentials
            .resolve(user_id, provider)?
            .filter(|c| adapter.accepts(c))
            .ok_or_else(|| IssueBridgeError::AuthenticationMissing {
                user_id: user_id.to_string(),
                provider,
            })?;

        let issue_id = issue.id.ok_or_else(|| {
            IssueBridgeError::Storage("Issue must be saved before it can be synced".to_string())
        })?;

        let mode = SyncMode::for_issue(issue, provider);
        let project = self.store.load_project(issue.project_id)?;
        let plan = adapter.build_plan(mode, issue, &project, &credentials)?;

        debug!(
            provider = %provider,
            issue_id,
            mode = %mode,
            requests = plan.requests().count(),
            "Sync plan built"
        );

        if let Some(preflight) = &plan.preflight {
            self.send(provider, preflight).await?;
        }
        let response = self.send(provider, &plan.request).await?;

        let outcome = adapter.interpret(mode, &response)?;

        if let SyncOutcome::Created {
            remote_id: Some(remote_id),
            ..
        } = &outcome
        {
            self.record_remote_id(issue, issue_id, provider, *remote_id)?;
        }

        info!(provider = %provider, issue_id, mode = %mode, ack = %outcome.ack(), "Issue synced");
        Ok(outcome)
    }

    /// Send one request; non-2xx answers become `ProviderRejected`
    async fn send(&self, provider: Provider, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(IssueBridgeError::ProviderRejected {
                provider,
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    /// Write a freshly created remote identifier, keeping whatever a
    /// concurrent sync stored first
    fn record_remote_id(
        &self,
        issue: &mut IssueRecord,
        issue_id: i64,
        provider: Provider,
        remote_id: u64,
    ) -> Result<()> {
        if self.store.claim_remote_id(issue_id, provider, remote_id)? {
            issue.set_remote_id(provider, Some(remote_id));
            return Ok(());
        }

        let stored = self.store.load_issue(issue_id)?.remote_id(provider);
        warn!(
            provider = %provider,
            issue_id,
            created = remote_id,
            stored = ?stored,
            "Remote identifier was already set by another sync; keeping stored value"
        );
        issue.set_remote_id(provider, stored);
        Ok(())
    }
}
