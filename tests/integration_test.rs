//! Integration tests for IssueBridge
//!
//! These tests drive full syncs through the real reqwest transport against a
//! local mock provider, with a SQLite store behind the engine.

use issuebridge::config::IssueBridgeConfig;
use issuebridge::model::{
    AuthenticationRecord, Board, BoardColumn, IssueRecord, Provider, ProjectRecord,
};
use issuebridge::providers::{ProviderAck, SyncOutcome};
use issuebridge::storage::{IssueStore, SqliteStore};
use issuebridge::sync::SyncEngine;
use issuebridge::transport::ReqwestTransport;
use issuebridge::IssueBridgeError;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock provider plus a store holding one project, one issue and user "1"'s
/// authentications for every provider
struct Harness {
    server: MockServer,
    config: IssueBridgeConfig,
    store: SqliteStore,
    transport: ReqwestTransport,
    issue: IssueRecord,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;

        let mut config = IssueBridgeConfig::new();
        config.user_agent = "issuebridge-test".to_string();
        config.providers.github.api_url = server.uri();
        config.providers.gitlab.api_url = server.uri();
        config.providers.bitbucket.api_url = server.uri();

        let store = SqliteStore::in_memory().unwrap();
        let mut project = ProjectRecord::new("web")
            .with_gitlab_project("group/web")
            .with_bitbucket("username", "slug");
        let project_id = store.save_project(&mut project).unwrap();

        let mut issue = IssueRecord::new(project_id, "Some title");
        store.save_issue(&mut issue).unwrap();

        store
            .save_authentication(&AuthenticationRecord::new("1", "123", Provider::GitHub, "token"))
            .unwrap();
        store
            .save_authentication(
                &AuthenticationRecord::new("1", "123", Provider::GitLab, "token")
                    .with_gitlab_private_token("token"),
            )
            .unwrap();
        store
            .save_authentication(&AuthenticationRecord::new(
                "1",
                "123",
                Provider::Bitbucket,
                "token",
            ))
            .unwrap();

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        Self {
            server,
            config,
            store,
            transport,
            issue,
        }
    }

    fn engine(&self) -> SyncEngine<'_> {
        SyncEngine::new(&self.config, &self.store, &self.transport, &self.store)
    }

    fn stored_issue(&self) -> IssueRecord {
        self.store.load_issue(self.issue.id.unwrap()).unwrap()
    }

    async fn received(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

mod github_tests {
    use super::*;

    async fn mount_labels(h: &Harness) {
        Mock::given(method("PATCH"))
            .and(path("/repos/some/project/issues/"))
            .and(body_string(r#"{"labels":[]}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;
    }

    #[tokio::test]
    async fn test_create_issue() {
        let h = Harness::start().await;
        mount_labels(&h).await;

        Mock::given(method("POST"))
            .and(path("/repos/some/project/issues"))
            .and(header("Accept", "application/vnd.github.v3+json"))
            .and(header("Authorization", "token token"))
            .and(header("Content-Type", "application/json"))
            .and(header("User-Agent", "issuebridge-test"))
            .and(body_string(r#"{"labels":[],"title":"Some title"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"number":1}"#))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let outcome = h.engine().sync_with_github(&mut issue, "1").await.unwrap();

        assert_eq!(outcome.ack(), &ProviderAck::Bool(true));
        assert_eq!(issue.github_issue_number, Some(1));
        assert_eq!(h.stored_issue().github_issue_number, Some(1));

        // Label reconciliation goes first
        let received = h.received().await;
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].method.as_str(), "PATCH");
        assert_eq!(received[1].method.as_str(), "POST");
    }

    #[tokio::test]
    async fn test_create_with_empty_response() {
        let h = Harness::start().await;
        mount_labels(&h).await;

        Mock::given(method("POST"))
            .and(path("/repos/some/project/issues"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let outcome = h.engine().sync_with_github(&mut issue, "1").await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Created {
                remote_id: None,
                ack: ProviderAck::Bool(true)
            }
        );
        assert_eq!(h.stored_issue().github_issue_number, None);
    }

    #[tokio::test]
    async fn test_update_issue() {
        let h = Harness::start().await;
        mount_labels(&h).await;

        Mock::given(method("PATCH"))
            .and(path("/repos/some/project/issues/1"))
            .and(header("Authorization", "token token"))
            .and(body_string(
                r#"{"title":"Some title","body":null,"labels":[],"state":"open"}"#,
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        issue.github_issue_number = Some(1);
        let outcome = h.engine().sync_with_github(&mut issue, "1").await.unwrap();

        assert_eq!(outcome.ack(), &ProviderAck::Body(String::new()));
        assert_eq!(issue.github_issue_number, Some(1));
    }

    #[tokio::test]
    async fn test_rejected_labels_stop_the_sync() {
        let h = Harness::start().await;

        Mock::given(method("PATCH"))
            .and(path("/repos/some/project/issues/"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let err = h
            .engine()
            .sync_with_github(&mut issue, "1")
            .await
            .unwrap_err();

        match err {
            IssueBridgeError::ProviderRejected {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, Provider::GitHub);
                assert_eq!(status, 422);
                assert_eq!(body, "Validation Failed");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(h.received().await.len(), 1);
        assert_eq!(issue.github_issue_number, None);
    }
}

mod gitlab_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_issue() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/group%2Fweb/issues"))
            .and(header("Accept", "application/json"))
            .and(header("Private-Token", "token"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string("title=Some%20title&description=&labels="))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"1"}"#))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let outcome = h.engine().sync_with_gitlab(&mut issue, "1").await.unwrap();

        assert_eq!(outcome.ack(), &ProviderAck::Bool(true));
        assert_eq!(issue.gitlab_issue_id, Some(1));
        assert_eq!(h.stored_issue().gitlab_issue_id, Some(1));
    }

    #[tokio::test]
    async fn test_update_issue() {
        let h = Harness::start().await;

        Mock::given(method("PUT"))
            .and(path("/projects/group%2Fweb/issues/1"))
            .and(header("Private-Token", "token"))
            .and(body_string("title=Some%20title&description=&labels="))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        issue.gitlab_issue_id = Some(1);
        let outcome = h.engine().sync_with_gitlab(&mut issue, "1").await.unwrap();

        assert_eq!(outcome, SyncOutcome::Updated { ack: ProviderAck::Bool(false) });
    }

    #[tokio::test]
    async fn test_server_error_leaves_issue_unlinked() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/group%2Fweb/issues"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let err = h
            .engine()
            .sync_with_gitlab(&mut issue, "1")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(issue.gitlab_issue_id, None);
        assert_eq!(h.stored_issue().gitlab_issue_id, None);
    }
}

mod bitbucket_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_issue() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .and(path("/2.0/repositories/username/slug/issues/"))
            .and(header("Accept", "*/*"))
            .and(header("Authorization", "Bearer token"))
            .and(body_string(r#"{"title":"Some title"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":1}"#))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        let outcome = h
            .engine()
            .sync_with_bitbucket(&mut issue, "1")
            .await
            .unwrap();

        assert_eq!(outcome.ack(), &ProviderAck::Null);
        assert_eq!(issue.bitbucket_issue_id, Some(1));
        assert_eq!(h.stored_issue().bitbucket_issue_id, Some(1));
    }

    #[tokio::test]
    async fn test_update_issue() {
        let h = Harness::start().await;

        Mock::given(method("PUT"))
            .and(path("/1.0/repositories/username/slug/issues/1/"))
            .and(header("Authorization", "Bearer token"))
            .and(body_string(r#"{"title":"Some title","content":null}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1,"b":2}"#))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        issue.bitbucket_issue_id = Some(1);
        let outcome = h
            .engine()
            .sync_with_bitbucket(&mut issue, "1")
            .await
            .unwrap();

        assert_eq!(outcome.ack(), &ProviderAck::Size(2));
    }

    #[tokio::test]
    async fn test_unlinked_project() {
        let h = Harness::start().await;

        let mut project = ProjectRecord::new("bare");
        let project_id = h.store.save_project(&mut project).unwrap();
        let mut issue = IssueRecord::new(project_id, "Some title");
        h.store.save_issue(&mut issue).unwrap();

        let err = h
            .engine()
            .sync_with_bitbucket(&mut issue, "1")
            .await
            .unwrap_err();

        assert!(matches!(err, IssueBridgeError::ProjectNotLinked { .. }));
        assert!(h.received().await.is_empty());
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_authentication_sends_nothing() {
        let h = Harness::start().await;

        for provider in Provider::ALL {
            let mut issue = h.issue.clone();
            let err = h
                .engine()
                .sync(provider, &mut issue, "someone-else")
                .await
                .unwrap_err();

            match err {
                IssueBridgeError::AuthenticationMissing { user_id, provider: p } => {
                    assert_eq!(user_id, "someone-else");
                    assert_eq!(p, provider);
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        assert!(h.received().await.is_empty());
    }

    #[tokio::test]
    async fn test_replaced_authentication_is_used() {
        let h = Harness::start().await;
        h.store
            .save_authentication(&AuthenticationRecord::new(
                "1",
                "123",
                Provider::Bitbucket,
                "rotated",
            ))
            .unwrap();

        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer rotated"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut issue = h.issue.clone();
        h.engine()
            .sync_with_bitbucket(&mut issue, "1")
            .await
            .unwrap();
    }
}

mod retry_tests {
    use super::*;
    use issuebridge::retry::{with_retry, RetryPolicy};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_caller_retries_transient_failure() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/group%2Fweb/issues"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/projects/group%2Fweb/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
            .mount(&h.server)
            .await;

        let engine = h.engine();
        let issue_id = h.issue.id.unwrap();
        let outcome = with_retry(&fast_policy(2), "sync", || async {
            let mut issue = h.store.load_issue(issue_id)?;
            engine.sync_with_gitlab(&mut issue, "1").await
        })
        .await
        .unwrap();

        assert!(outcome.is_created());
        assert_eq!(h.stored_issue().gitlab_issue_id, Some(7));
        assert_eq!(h.received().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;

        let engine = h.engine();
        let err = with_retry(&fast_policy(3), "sync", || {
            let mut attempt_issue = h.issue.clone();
            let engine = &engine;
            async move { engine.sync_with_bitbucket(&mut attempt_issue, "1").await }
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.received().await.len(), 1);
        assert_eq!(h.stored_issue().bitbucket_issue_id, None);
    }
}

mod tagging_tests {
    use super::*;
    use issuebridge::tagging::{save_issue, BacklogTagSource, TagAssignmentRule};

    fn project_with_backlog(store: &SqliteStore, tags: &[&str]) -> i64 {
        let mut project = ProjectRecord::new("tagged");
        let project_id = store.save_project(&mut project).unwrap();

        let mut board = Board::new("main").with_project(project_id);
        let board_id = store.create_board(&mut board).unwrap();

        let mut done = BoardColumn::new(board_id, "Done").at_position(2).with_tag("done");
        store.add_column(&mut done).unwrap();

        let mut backlog = BoardColumn::new(board_id, "Backlog").at_position(1).backlog();
        for tag in tags {
            backlog = backlog.with_tag(*tag);
        }
        store.add_column(&mut backlog).unwrap();

        project_id
    }

    #[test]
    fn test_untagged_issue_gets_backlog_tags() {
        let store = SqliteStore::in_memory().unwrap();
        let project_id = project_with_backlog(&store, &["triage", "todo"]);
        let rule = TagAssignmentRule::new(&store);

        let mut issue = IssueRecord::new(project_id, "New issue");
        let id = save_issue(&store, &rule, &mut issue).unwrap();

        let stored = store.load_issue(id).unwrap();
        let tags: Vec<&str> = stored.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["todo", "triage"]);
    }

    #[test]
    fn test_tagged_issue_keeps_its_tags() {
        let store = SqliteStore::in_memory().unwrap();
        let project_id = project_with_backlog(&store, &["todo"]);
        let rule = TagAssignmentRule::new(&store);

        let mut issue = IssueRecord::new(project_id, "New issue").with_tag("new");
        let id = save_issue(&store, &rule, &mut issue).unwrap();

        let stored = store.load_issue(id).unwrap();
        assert!(stored.tags.contains("new"));
        assert_eq!(stored.tags.len(), 1);
    }

    #[test]
    fn test_empty_backlog_column_assigns_no_tags() {
        let store = SqliteStore::in_memory().unwrap();
        let project_id = project_with_backlog(&store, &[]);

        let backlog = store.find_default_backlog_tags(project_id).unwrap();
        assert_eq!(backlog, Some(Default::default()));

        let rule = TagAssignmentRule::new(&store);
        let mut issue = IssueRecord::new(project_id, "New issue");
        assert!(rule.apply(&mut issue).unwrap());

        let id = save_issue(&store, &rule, &mut issue).unwrap();
        assert!(store.load_issue(id).unwrap().tags.is_empty());
    }

    #[tokio::test]
    async fn test_saving_a_stale_copy_keeps_the_remote_id() {
        let h = Harness::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/group%2Fweb/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/projects/group%2Fweb/issues/7"))
            .and(body_string("title=Edited&description=&labels="))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&h.server)
            .await;

        // Editor's copy, loaded before the sync recorded an identifier
        let mut edited = h.stored_issue();

        let mut synced = h.stored_issue();
        h.engine().sync_with_gitlab(&mut synced, "1").await.unwrap();
        assert_eq!(h.stored_issue().gitlab_issue_id, Some(7));

        let rule = TagAssignmentRule::new(&h.store);
        edited.title = "Edited".to_string();
        save_issue(&h.store, &rule, &mut edited).unwrap();

        assert_eq!(h.stored_issue().gitlab_issue_id, Some(7));
        assert_eq!(edited.gitlab_issue_id, Some(7));

        // The next sync updates instead of creating a duplicate
        let outcome = h.engine().sync_with_gitlab(&mut edited, "1").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated { ack: ProviderAck::Bool(false) });
    }

    #[test]
    fn test_project_without_board_saves_untagged() {
        let store = SqliteStore::in_memory().unwrap();
        let mut project = ProjectRecord::new("loose");
        let project_id = store.save_project(&mut project).unwrap();
        let rule = TagAssignmentRule::new(&store);

        let mut issue = IssueRecord::new(project_id, "New issue");
        let id = save_issue(&store, &rule, &mut issue).unwrap();

        assert!(store.load_issue(id).unwrap().tags.is_empty());
    }

    #[tokio::test]
    async fn test_assigned_tags_flow_into_github_labels() {
        let h = Harness::start().await;
        let project_id = project_with_backlog(&h.store, &["todo"]);
        let rule = TagAssignmentRule::new(&h.store);

        let mut issue = IssueRecord::new(project_id, "Some title");
        save_issue(&h.store, &rule, &mut issue).unwrap();

        Mock::given(method("PATCH"))
            .and(path("/repos/some/project/issues/"))
            .and(body_string(r#"{"labels":["todo"]}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/some/project/issues"))
            .and(body_string(r#"{"labels":["todo"],"title":"Some title"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"number":3}"#))
            .expect(1)
            .mount(&h.server)
            .await;

        h.engine().sync_with_github(&mut issue, "1").await.unwrap();
        assert_eq!(issue.github_issue_number, Some(3));
    }
}

mod config_tests {
    use super::*;
    use issuebridge::config::validate_config_result;
    use tempfile::TempDir;

    #[test]
    fn test_self_hosted_endpoints_from_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        std::fs::write(
            &config_path,
            r#"
database: /tmp/issuebridge-test.db
github:
  api_url: https://github.example.com/api/v3
  repository: acme/tracker
gitlab:
  api_url: https://gitlab.example.com/api/v4
"#,
        )
        .unwrap();

        let config = IssueBridgeConfig::load(&config_path).unwrap();
        assert_eq!(
            config.providers.github.api_url,
            "https://github.example.com/api/v3"
        );
        assert_eq!(config.providers.github.repository, "acme/tracker");
        assert_eq!(
            config.providers.gitlab.api_url,
            "https://gitlab.example.com/api/v4"
        );
        assert_eq!(config.providers.bitbucket.update_version, "1.0");
        validate_config_result(&config).unwrap();
    }

    #[test]
    fn test_invalid_endpoint_fails_validation() {
        let mut config = IssueBridgeConfig::new();
        config.providers.gitlab.api_url = "gitlab.example.com/".to_string();
        assert!(validate_config_result(&config).is_err());
    }
}
