use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;

/// Row-level change kind carried by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change-feed delivery for one row.
///
/// `new` is populated for INSERT and UPDATE, `old` for UPDATE and DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub new: Option<Bookmark>,
    pub old: Option<Bookmark>,
}

impl ChangeEvent {
    pub fn insert(table: &str, row: Bookmark) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn delete(table: &str, row: Bookmark) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Delete,
            new: None,
            old: Some(row),
        }
    }

    /// The row a subscription filter is evaluated against.
    pub fn row(&self) -> Option<&Bookmark> {
        match self.kind {
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
            ChangeKind::Delete => self.old.as_ref(),
        }
    }
}
