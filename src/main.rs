//! IssueBridge - Push local issues to GitHub, GitLab and Bitbucket
//!
//! Main entry point for the issuebridge CLI.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use issuebridge::config::{validate_config_result, IssueBridgeConfig};
use issuebridge::model::{
    AuthenticationRecord, Board, BoardColumn, IssueRecord, IssueState, Provider, ProjectRecord,
};
use issuebridge::retry::{with_retry, RetryPolicy};
use issuebridge::storage::{IssueStore, SqliteStore};
use issuebridge::sync::SyncEngine;
use issuebridge::tagging::{self, TagAssignmentRule};
use issuebridge::transport::ReqwestTransport;
use std::path::PathBuf;
use std::process;

/// IssueBridge - Mirror local issues to hosted trackers
#[derive(Parser, Debug)]
#[command(name = "issuebridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/issuebridge/config.yaml)
    #[arg(short, long, env = "ISSUEBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration and create the database
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Manage local issues
    #[command(subcommand)]
    Issue(IssueCommands),

    /// Manage provider authentications
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Manage boards and their columns
    #[command(subcommand)]
    Board(BoardCommands),

    /// Create or update an issue on a provider
    Sync {
        /// Local issue id
        issue: i64,

        /// Provider (github, gitlab, bitbucket)
        #[arg(short, long)]
        provider: Provider,

        /// User whose authentication signs the requests
        #[arg(short, long)]
        user: String,

        /// Retries on transient failures (network errors, 429, 5xx)
        #[arg(long, default_value = "0")]
        retries: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommands {
    /// Add a project
    Add {
        name: String,

        /// GitHub repository (owner/name); defaults to the configured one
        #[arg(long)]
        github: Option<String>,

        /// GitLab project path (group/name)
        #[arg(long)]
        gitlab: Option<String>,

        /// Bitbucket repository (owner/slug)
        #[arg(long)]
        bitbucket: Option<String>,
    },

    /// List projects
    List,
}

#[derive(Subcommand, Debug)]
enum IssueCommands {
    /// Create an issue; untagged issues pick up backlog column tags
    Create {
        /// Owning project id
        project: i64,

        title: String,

        #[arg(short, long)]
        body: Option<String>,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Create the issue closed
        #[arg(long)]
        closed: bool,
    },

    /// Show one issue with its remote identifiers
    Show { id: i64 },

    /// List issues
    List {
        /// Only issues of this project
        #[arg(short, long)]
        project: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommands {
    /// Store (or replace) a user's authentication for a provider
    Add {
        /// Local user id
        user: String,

        /// Provider (github, gitlab, bitbucket)
        provider: Provider,

        /// OAuth access token
        #[arg(long, env = "ISSUEBRIDGE_TOKEN", hide_env_values = true)]
        token: String,

        /// Account id on the provider
        #[arg(long, default_value = "")]
        uid: String,

        /// GitLab private token
        #[arg(long, env = "ISSUEBRIDGE_GITLAB_PRIVATE_TOKEN", hide_env_values = true)]
        private_token: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum BoardCommands {
    /// Create a board over one or more projects
    Create {
        name: String,

        /// Project id (repeatable)
        #[arg(short, long = "project", required = true)]
        projects: Vec<i64>,
    },

    /// Add a column to a board
    AddColumn {
        board: i64,

        name: String,

        #[arg(long, default_value = "0")]
        position: i64,

        /// Mark as the backlog column
        #[arg(long)]
        backlog: bool,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = issuebridge::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Init { force } => return handle_init_command(cli.config, force),
        command => command,
    };

    let config = match &cli.config {
        Some(path) => IssueBridgeConfig::load(path)?,
        None => IssueBridgeConfig::load_or_default()?,
    };
    validate_config_result(&config)?;

    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;

    match command {
        Commands::Init { .. } => Ok(()),
        Commands::Project(cmd) => handle_project_command(cmd, &store),
        Commands::Issue(cmd) => handle_issue_command(cmd, &store),
        Commands::Auth(cmd) => handle_auth_command(cmd, &store),
        Commands::Board(cmd) => handle_board_command(cmd, &store),
        Commands::Sync {
            issue,
            provider,
            user,
            retries,
        } => handle_sync_command(&config, &store, issue, provider, &user, retries).await,
    }
}

fn handle_init_command(config_path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(IssueBridgeConfig::default_path);
    if path.exists() && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = IssueBridgeConfig::new();
    config.save(&path)?;
    SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to create database {}", config.database.display()))?;

    println!("Created configuration at {}", path.display());
    println!("Database: {}", config.database.display());
    Ok(())
}

fn handle_project_command(cmd: ProjectCommands, store: &SqliteStore) -> anyhow::Result<()> {
    match cmd {
        ProjectCommands::Add {
            name,
            github,
            gitlab,
            bitbucket,
        } => {
            let mut project = ProjectRecord::new(name);
            if let Some(repo) = github {
                project = project.with_github_repository(repo);
            }
            if let Some(path) = gitlab {
                project = project.with_gitlab_project(path);
            }
            if let Some(repo) = bitbucket {
                let (owner, slug) = repo
                    .split_once('/')
                    .ok_or_else(|| anyhow!("Bitbucket repository must be owner/slug: {}", repo))?;
                project = project.with_bitbucket(owner, slug);
            }

            let id = store.save_project(&mut project)?;
            println!("Added project {} ({})", id, project.name);
        }
        ProjectCommands::List => {
            let projects = store.list_projects()?;
            println!("Projects: {}", projects.len());
            for project in projects {
                println!(
                    "  {:>4}  {}  github={} gitlab={} bitbucket={}",
                    project.id.unwrap_or_default(),
                    project.name,
                    project.github_repository.as_deref().unwrap_or("-"),
                    if project.gitlab_project.is_empty() {
                        "-"
                    } else {
                        project.gitlab_project.as_str()
                    },
                    project
                        .bitbucket_repository()
                        .map(|(o, s)| format!("{}/{}", o, s))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
        }
    }
    Ok(())
}

fn handle_issue_command(cmd: IssueCommands, store: &SqliteStore) -> anyhow::Result<()> {
    match cmd {
        IssueCommands::Create {
            project,
            title,
            body,
            tags,
            closed,
        } => {
            store.load_project(project)?;

            let mut issue = IssueRecord::new(project, title);
            if let Some(body) = body {
                issue = issue.with_body(body);
            }
            for tag in tags {
                issue = issue.with_tag(tag);
            }
            if closed {
                issue = issue.with_state(IssueState::Closed);
            }

            let rule = TagAssignmentRule::new(store);
            let id = tagging::save_issue(store, &rule, &mut issue)?;
            println!("Created issue {}", id);
            print_issue(&issue);
        }
        IssueCommands::Show { id } => {
            let issue = store.load_issue(id)?;
            print_issue(&issue);
        }
        IssueCommands::List { project } => {
            let issues = store.list_issues(project)?;
            println!("Issues: {}", issues.len());
            for issue in issues {
                println!(
                    "  {:>4}  [{}] {}",
                    issue.id.unwrap_or_default(),
                    issue.state,
                    issue.title
                );
            }
        }
    }
    Ok(())
}

fn handle_auth_command(cmd: AuthCommands, store: &SqliteStore) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Add {
            user,
            provider,
            token,
            uid,
            private_token,
        } => {
            let mut auth = AuthenticationRecord::new(&user, uid, provider, token);
            if let Some(private_token) = private_token {
                auth = auth.with_gitlab_private_token(private_token);
            } else if provider == Provider::GitLab {
                eprintln!("Warning: GitLab syncs need --private-token");
            }
            store.save_authentication(&auth)?;
            println!("Saved {} authentication for user {}", provider, user);
        }
    }
    Ok(())
}

fn handle_board_command(cmd: BoardCommands, store: &SqliteStore) -> anyhow::Result<()> {
    match cmd {
        BoardCommands::Create { name, projects } => {
            let mut board = Board::new(name);
            for project in projects {
                store.load_project(project)?;
                board = board.with_project(project);
            }
            let id = store.create_board(&mut board)?;
            println!("Created board {} ({})", id, board.name);
        }
        BoardCommands::AddColumn {
            board,
            name,
            position,
            backlog,
            tags,
        } => {
            let mut column = BoardColumn::new(board, name).at_position(position);
            if backlog {
                column = column.backlog();
            }
            for tag in tags {
                column = column.with_tag(tag);
            }
            let id = store.add_column(&mut column)?;
            println!("Added column {} ({}) to board {}", id, column.name, board);
        }
    }
    Ok(())
}

async fn handle_sync_command(
    config: &IssueBridgeConfig,
    store: &SqliteStore,
    issue_id: i64,
    provider: Provider,
    user: &str,
    retries: u32,
) -> anyhow::Result<()> {
    let transport = ReqwestTransport::new(config.request_timeout())?;
    let engine = SyncEngine::new(config, store, &transport, store);
    let policy = RetryPolicy::with_max_retries(retries);

    // Reload per attempt; a retry must see identifiers stored since the last one
    let outcome = with_retry(&policy, "sync", || async {
        let mut issue = store.load_issue(issue_id)?;
        engine.sync(provider, &mut issue, user).await
    })
    .await
    .with_context(|| format!("Failed to sync issue {} with {}", issue_id, provider))?;

    println!("{}", serde_json::to_string(outcome.ack())?);
    Ok(())
}

fn print_issue(issue: &IssueRecord) {
    println!("{}: {}", issue.id.unwrap_or_default(), issue.title);
    println!("  State:   {}", issue.state);
    println!("  Project: {}", issue.project_id);
    if !issue.tags.is_empty() {
        let tags: Vec<&str> = issue.tags.iter().map(String::as_str).collect();
        println!("  Tags:    {}", tags.join(", "));
    }
    for provider in Provider::ALL {
        if let Some(remote_id) = issue.remote_id(provider) {
            println!("  {:<9} #{}", format!("{}:", provider), remote_id);
        }
    }
    if let Some(body) = &issue.body {
        println!();
        println!("{}", body);
    }
}
