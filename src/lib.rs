//! IssueBridge - Push local issues to GitHub, GitLab and Bitbucket
//!
//! Issues live in a local SQLite database. Each one can be mirrored to any
//! of three hosted trackers: the first sync creates the remote issue and
//! records its identifier, later syncs update it.
//!
//! # Architecture
//!
//! - **model**: Issues, projects, boards and stored authentications
//! - **storage**: SQLite persistence
//! - **providers**: Per-tracker request building and response reading
//! - **transport**: HTTP sending (reqwest)
//! - **sync**: The create-or-update engine
//! - **tagging**: Backlog tag assignment on save
//! - **config**: YAML configuration
//! - **retry**: Caller-side retry with backoff

// Core modules
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

// Sync pipeline
pub mod providers;
pub mod sync;
pub mod tagging;
pub mod transport;

// Utilities
pub mod logging;
pub mod retry;

// Re-exports
pub use error::{IssueBridgeError, Result};
