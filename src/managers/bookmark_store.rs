//! Relational bookmark store for Smartmarks.
//!
//! [`BookmarkStore`] is the boundary the mutation gateway and the page loader
//! talk to. [`SqliteBookmarkStore`] implements it on top of `rusqlite` and
//! publishes every committed insert/delete on the [`ChangeFeed`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::change_feed::{ChangeFeed, BOOKMARKS_TABLE};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StoreError;
use crate::types::event::ChangeEvent;
use crate::types::filter::Filter;

/// Operations the relational store exposes for the `bookmarks` table.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Inserts a row; the store assigns `id` and `created_at`.
    async fn insert(&self, record: NewBookmark) -> Result<Bookmark, StoreError>;
    /// Deletes every row matching the equality conjunction. Returns the number removed.
    async fn delete(&self, filter: &Filter) -> Result<usize, StoreError>;
    /// Rows matching `filter`, newest first.
    async fn query(&self, filter: &Filter) -> Result<Vec<Bookmark>, StoreError>;
    /// Change stamp for one user's rows. It moves on every insert or delete of
    /// their rows, whoever made it.
    async fn version(&self, user_id: &str) -> Result<u64, StoreError>;
}

const SELECT_COLUMNS: &str = "id, title, url, user_id, created_at";

/// `BookmarkStore` backed by the shared SQLite database.
pub struct SqliteBookmarkStore {
    db: Arc<Database>,
    feed: Arc<ChangeFeed>,
}

impl SqliteBookmarkStore {
    pub fn new(db: Arc<Database>, feed: Arc<ChangeFeed>) -> Self {
        Self { db, feed }
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn insert(&self, record: NewBookmark) -> Result<Bookmark, StoreError> {
        let bookmark = {
            let conn = self.db.connection();
            // Timestamps must strictly increase so newest-first stays a total order.
            let last: Option<i64> =
                conn.query_row("SELECT MAX(created_at) FROM bookmarks", [], |row| row.get(0))?;
            let now = Self::now_millis();
            let created_at = match last {
                Some(last) if last >= now => last + 1,
                _ => now,
            };

            let bookmark = Bookmark {
                id: Uuid::new_v4().to_string(),
                title: record.title,
                url: record.url,
                user_id: record.user_id,
                created_at,
            };
            conn.execute(
                "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    bookmark.id,
                    bookmark.title,
                    bookmark.url,
                    bookmark.user_id,
                    bookmark.created_at
                ],
            )?;
            bookmark
        };

        debug!(id = %bookmark.id, user_id = %bookmark.user_id, "inserted bookmark");
        self.feed
            .publish(&ChangeEvent::insert(BOOKMARKS_TABLE, bookmark.clone()));
        Ok(bookmark)
    }

    async fn delete(&self, filter: &Filter) -> Result<usize, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::UnscopedDelete);
        }
        let (where_sql, values) = filter.to_sql();

        let removed = {
            let conn = self.db.connection();
            let mut stmt = conn.prepare(&format!(
                "DELETE FROM bookmarks WHERE {} RETURNING {}",
                where_sql, SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params_from_iter(values.iter()), Self::row_to_bookmark)?;
            let removed = rows.collect::<Result<Vec<_>, _>>()?;
            removed
        };

        debug!(filter = %filter, removed = removed.len(), "deleted bookmarks");
        for row in &removed {
            self.feed
                .publish(&ChangeEvent::delete(BOOKMARKS_TABLE, row.clone()));
        }
        Ok(removed.len())
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Bookmark>, StoreError> {
        let (where_sql, values) = filter.to_sql();
        let sql = if filter.is_empty() {
            format!("SELECT {} FROM bookmarks ORDER BY created_at DESC", SELECT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM bookmarks WHERE {} ORDER BY created_at DESC",
                SELECT_COLUMNS, where_sql
            )
        };

        let conn = self.db.connection();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn version(&self, user_id: &str) -> Result<u64, StoreError> {
        let conn = self.db.connection();
        let version: i64 = conn.query_row(
            "SELECT COALESCE((SELECT version FROM bookmark_versions WHERE user_id = ?1), 0)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(version as u64)
    }
}
