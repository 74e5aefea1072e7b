//! SQLite store implementation

use super::IssueStore;
use crate::model::{
    AuthenticationRecord, Board, BoardColumn, Credentials, IssueRecord, IssueState, Provider,
    ProjectRecord,
};
use crate::sync::CredentialResolver;
use crate::tagging::BacklogTagSource;
use crate::{IssueBridgeError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Opening issue database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Fresh private database, for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                github_repository TEXT,
                gitlab_project TEXT NOT NULL DEFAULT '',
                bitbucket_owner TEXT,
                bitbucket_slug TEXT
            );

            CREATE TABLE IF NOT EXISTS issues (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id),
                title TEXT NOT NULL,
                body TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                state TEXT NOT NULL,
                github_issue_number INTEGER,
                gitlab_issue_id INTEGER,
                bitbucket_issue_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS authentications (
                user_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                uid TEXT NOT NULL,
                token TEXT NOT NULL,
                gitlab_private_token TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, provider)
            );

            CREATE TABLE IF NOT EXISTS boards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS board_projects (
                board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                PRIMARY KEY (board_id, project_id)
            );

            CREATE TABLE IF NOT EXISTS board_columns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                backlog INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
            CREATE INDEX IF NOT EXISTS idx_columns_board ON board_columns(board_id);
            "#,
        )?;

        Ok(())
    }

    /// Insert or update a project, assigning its id on first save
    pub fn save_project(&self, project: &mut ProjectRecord) -> Result<i64> {
        match project.id {
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO projects (
                        name, github_repository, gitlab_project, bitbucket_owner, bitbucket_slug
                    ) VALUES (?, ?, ?, ?, ?)
                    "#,
                    params![
                        &project.name,
                        project.github_repository.as_deref(),
                        &project.gitlab_project,
                        project.bitbucket_owner.as_deref(),
                        project.bitbucket_slug.as_deref(),
                    ],
                )?;
                let id = self.conn.last_insert_rowid();
                project.id = Some(id);
                tracing::debug!(project_id = id, name = %project.name, "Project created");
                Ok(id)
            }
            Some(id) => {
                let changed = self.conn.execute(
                    r#"
                    UPDATE projects SET
                        name = ?, github_repository = ?, gitlab_project = ?,
                        bitbucket_owner = ?, bitbucket_slug = ?
                    WHERE id = ?
                    "#,
                    params![
                        &project.name,
                        project.github_repository.as_deref(),
                        &project.gitlab_project,
                        project.bitbucket_owner.as_deref(),
                        project.bitbucket_slug.as_deref(),
                        id,
                    ],
                )?;
                if changed == 0 {
                    return Err(IssueBridgeError::ProjectNotFound(id));
                }
                Ok(id)
            }
        }
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, github_repository, gitlab_project, bitbucket_owner, bitbucket_slug
            FROM projects ORDER BY id
            "#,
        )?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn list_issues(&self, project_id: Option<i64>) -> Result<Vec<IssueRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project_id, title, body, tags, state,
                   github_issue_number, gitlab_issue_id, bitbucket_issue_id
            FROM issues
            WHERE ?1 IS NULL OR project_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([project_id], issue_row)?;

        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?.into_record()?);
        }
        Ok(issues)
    }

    /// Store an authentication, replacing any existing one for the same
    /// user and provider
    pub fn save_authentication(&self, auth: &AuthenticationRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO authentications (
                user_id, provider, uid, token, gitlab_private_token, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                uid = excluded.uid,
                token = excluded.token,
                gitlab_private_token = excluded.gitlab_private_token
            "#,
            params![
                &auth.user_id,
                auth.provider.as_str(),
                &auth.uid,
                &auth.token,
                auth.gitlab_private_token.as_deref(),
                now(),
            ],
        )?;

        tracing::info!(user_id = %auth.user_id, provider = %auth.provider, "Authentication stored");
        Ok(())
    }

    pub fn find_authentication(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<AuthenticationRecord>> {
        let record = self
            .conn
            .query_row(
                r#"
                SELECT user_id, uid, token, gitlab_private_token
                FROM authentications WHERE user_id = ? AND provider = ?
                "#,
                params![user_id, provider.as_str()],
                |row| {
                    Ok(AuthenticationRecord {
                        user_id: row.get(0)?,
                        uid: row.get(1)?,
                        provider,
                        token: row.get(2)?,
                        gitlab_private_token: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Insert a board and link it to its projects
    pub fn create_board(&self, board: &mut Board) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("INSERT INTO boards (name) VALUES (?)", [&board.name])?;
        let id = tx.last_insert_rowid();
        for project_id in &board.project_ids {
            tx.execute(
                "INSERT OR IGNORE INTO board_projects (board_id, project_id) VALUES (?, ?)",
                params![id, project_id],
            )?;
        }
        tx.commit()?;

        board.id = Some(id);
        Ok(id)
    }

    pub fn add_column(&self, column: &mut BoardColumn) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO board_columns (board_id, name, position, backlog, tags)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                column.board_id,
                &column.name,
                column.position,
                column.backlog,
                serde_json::to_string(&column.tags)?,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        column.id = Some(id);
        Ok(id)
    }

    pub fn load_columns(&self, board_id: i64) -> Result<Vec<BoardColumn>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, board_id, name, position, backlog, tags
            FROM board_columns WHERE board_id = ? ORDER BY position, id
            "#,
        )?;
        let rows = stmt.query_map([board_id], |row| {
            Ok((
                BoardColumn {
                    id: row.get(0)?,
                    board_id: row.get(1)?,
                    name: row.get(2)?,
                    position: row.get(3)?,
                    backlog: row.get(4)?,
                    tags: BTreeSet::new(),
                },
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (mut column, tags) = row?;
            column.tags = serde_json::from_str(&tags)?;
            columns.push(column);
        }
        Ok(columns)
    }
}

impl IssueStore for SqliteStore {
    fn load_issue(&self, id: i64) -> Result<IssueRecord> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, project_id, title, body, tags, state,
                       github_issue_number, gitlab_issue_id, bitbucket_issue_id
                FROM issues WHERE id = ?
                "#,
                [id],
                issue_row,
            )
            .optional()?
            .ok_or(IssueBridgeError::IssueNotFound(id))?;
        row.into_record()
    }

    fn load_project(&self, id: i64) -> Result<ProjectRecord> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, github_repository, gitlab_project, bitbucket_owner, bitbucket_slug
                FROM projects WHERE id = ?
                "#,
                [id],
                project_from_row,
            )
            .optional()?
            .ok_or(IssueBridgeError::ProjectNotFound(id))
    }

    fn save_issue(&self, issue: &mut IssueRecord) -> Result<i64> {
        let tags = serde_json::to_string(&issue.tags)?;
        let timestamp = now();

        match issue.id {
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO issues (
                        project_id, title, body, tags, state,
                        github_issue_number, gitlab_issue_id, bitbucket_issue_id,
                        created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        issue.project_id,
                        &issue.title,
                        issue.body.as_deref(),
                        tags,
                        issue.state.as_str(),
                        to_sql_id(issue.github_issue_number)?,
                        to_sql_id(issue.gitlab_issue_id)?,
                        to_sql_id(issue.bitbucket_issue_id)?,
                        &timestamp,
                        &timestamp,
                    ],
                )?;
                let id = self.conn.last_insert_rowid();
                issue.id = Some(id);
                tracing::debug!(issue_id = id, "Issue created");
                Ok(id)
            }
            Some(id) => {
                let changed = self.conn.execute(
                    r#"
                    UPDATE issues SET
                        project_id = ?, title = ?, body = ?, tags = ?, state = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        issue.project_id,
                        &issue.title,
                        issue.body.as_deref(),
                        tags,
                        issue.state.as_str(),
                        &timestamp,
                        id,
                    ],
                )?;
                if changed == 0 {
                    return Err(IssueBridgeError::IssueNotFound(id));
                }

                // Remote identifiers are only written by claim_remote_id.
                let stored = self.load_issue(id)?;
                for provider in Provider::ALL {
                    issue.set_remote_id(provider, stored.remote_id(provider));
                }
                Ok(id)
            }
        }
    }

    fn claim_remote_id(&self, issue_id: i64, provider: Provider, remote_id: u64) -> Result<bool> {
        let column = remote_id_column(provider);
        let sql = format!(
            "UPDATE issues SET {column} = ?1, updated_at = ?2 WHERE id = ?3 AND {column} IS NULL"
        );
        let changed = self.conn.execute(
            &sql,
            params![to_sql_id(Some(remote_id))?, now(), issue_id],
        )?;

        if changed == 0 {
            // Distinguish a lost race from a missing row.
            self.load_issue(issue_id)?;
            return Ok(false);
        }
        Ok(true)
    }
}

impl CredentialResolver for SqliteStore {
    fn resolve(&self, user_id: &str, provider: Provider) -> Result<Option<Credentials>> {
        Ok(self
            .find_authentication(user_id, provider)?
            .map(|auth| auth.credentials()))
    }
}

impl BacklogTagSource for SqliteStore {
    fn find_default_backlog_tags(&self, project_id: i64) -> Result<Option<BTreeSet<String>>> {
        let tags: Option<String> = self
            .conn
            .query_row(
                r#"
                SELECT c.tags
                FROM board_columns c
                JOIN board_projects bp ON bp.board_id = c.board_id
                WHERE bp.project_id = ? AND c.backlog = 1
                ORDER BY c.board_id, c.position, c.id
                LIMIT 1
                "#,
                [project_id],
                |row| row.get(0),
            )
            .optional()?;

        match tags {
            Some(tags) => Ok(Some(serde_json::from_str(&tags)?)),
            None => Ok(None),
        }
    }
}

/// Raw issue columns, decoded outside the rusqlite row closure
struct IssueRow {
    id: i64,
    project_id: i64,
    title: String,
    body: Option<String>,
    tags: String,
    state: String,
    github_issue_number: Option<i64>,
    gitlab_issue_id: Option<i64>,
    bitbucket_issue_id: Option<i64>,
}

impl IssueRow {
    fn into_record(self) -> Result<IssueRecord> {
        Ok(IssueRecord {
            id: Some(self.id),
            title: self.title,
            body: self.body,
            tags: serde_json::from_str(&self.tags)?,
            state: self
                .state
                .parse::<IssueState>()
                .map_err(IssueBridgeError::Storage)?,
            project_id: self.project_id,
            github_issue_number: from_sql_id(self.github_issue_number)?,
            gitlab_issue_id: from_sql_id(self.gitlab_issue_id)?,
            bitbucket_issue_id: from_sql_id(self.bitbucket_issue_id)?,
        })
    }
}

fn issue_row(row: &Row<'_>) -> rusqlite::Result<IssueRow> {
    Ok(IssueRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        tags: row.get(4)?,
        state: row.get(5)?,
        github_issue_number: row.get(6)?,
        gitlab_issue_id: row.get(7)?,
        bitbucket_issue_id: row.get(8)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        github_repository: row.get(2)?,
        gitlab_project: row.get(3)?,
        bitbucket_owner: row.get(4)?,
        bitbucket_slug: row.get(5)?,
    })
}

fn remote_id_column(provider: Provider) -> &'static str {
    match provider {
        Provider::GitHub => "github_issue_number",
        Provider::GitLab => "gitlab_issue_id",
        Provider::Bitbucket => "bitbucket_issue_id",
    }
}

fn to_sql_id(id: Option<u64>) -> Result<Option<i64>> {
    id.map(|n| {
        i64::try_from(n)
            .map_err(|_| IssueBridgeError::Storage(format!("Remote id {} out of range", n)))
    })
    .transpose()
}

fn from_sql_id(id: Option<i64>) -> Result<Option<u64>> {
    id.map(|n| {
        u64::try_from(n)
            .map_err(|_| IssueBridgeError::Storage(format!("Negative remote id {}", n)))
    })
    .transpose()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
