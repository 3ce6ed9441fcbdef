//! Equality-conjunction filters over the `bookmarks` table.
//!
//! The same type scopes store deletes (`id = ? AND user_id = ?`) and change-feed
//! subscriptions (`user_id=eq.<uuid>`), so both sides agree on what "owned by"
//! means.

use std::fmt;

use super::bookmark::{Bookmark, BookmarkColumn};
use super::errors::FeedError;

/// An ordered conjunction of `column = value` clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(BookmarkColumn, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `column = value` clause.
    pub fn eq(mut self, column: BookmarkColumn, value: impl Into<String>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn clauses(&self) -> &[(BookmarkColumn, String)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the value constrained for `column`, if any.
    pub fn value_for(&self, column: BookmarkColumn) -> Option<&str> {
        self.clauses
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }

    /// True if every clause holds for the given row. An empty filter matches everything.
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        self.clauses
            .iter()
            .all(|(column, value)| column.value_of(bookmark) == value)
    }

    /// Renders the filter as a parameterized SQL `WHERE` body plus its bound values.
    ///
    /// Column names come from [`BookmarkColumn`], never from user input.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let body = self
            .clauses
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column.as_str(), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let values = self.clauses.iter().map(|(_, v)| v.clone()).collect();
        (body, values)
    }

    /// Parses the `column=eq.value` syntax, with `&` joining several clauses.
    ///
    /// Values may not contain `&`.
    pub fn parse(expr: &str) -> Result<Self, FeedError> {
        let mut filter = Filter::new();
        for part in expr.split('&').map(str::trim).filter(|p| !p.is_empty()) {
            let (column, rest) = part
                .split_once('=')
                .ok_or_else(|| FeedError::InvalidFilter(part.to_string()))?;
            let value = rest
                .strip_prefix("eq.")
                .ok_or_else(|| FeedError::InvalidFilter(part.to_string()))?;
            let column = BookmarkColumn::parse(column.trim())
                .ok_or_else(|| FeedError::InvalidFilter(format!("unknown column in '{}'", part)))?;
            filter = filter.eq(column, value);
        }
        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (column, value)) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}=eq.{}", column.as_str(), value)?;
        }
        Ok(())
    }
}
