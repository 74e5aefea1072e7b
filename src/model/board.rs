//! Boards and their columns

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A board shown over one or more projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub name: String,

    #[serde(default)]
    pub project_ids: Vec<i64>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            project_ids: Vec::new(),
        }
    }

    pub fn with_project(mut self, project_id: i64) -> Self {
        self.project_ids.push(project_id);
        self
    }
}

/// A column on a board
///
/// A column flagged `backlog` is where untagged issues land; its tags are
/// copied onto them on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub board_id: i64,

    pub name: String,

    /// Left-to-right order on the board
    #[serde(default)]
    pub position: i64,

    #[serde(default)]
    pub backlog: bool,

    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl BoardColumn {
    pub fn new(board_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: None,
            board_id,
            name: name.into(),
            position: 0,
            backlog: false,
            tags: BTreeSet::new(),
        }
    }

    pub fn backlog(mut self) -> Self {
        self.backlog = true;
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}
