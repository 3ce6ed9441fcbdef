//! Server-rendered snapshot cache.
//!
//! Holds the newest-first bookmark list each user's home page was last
//! rendered from, tagged with the store's change stamp for that user
//! ([`BookmarkStore::version`]). A snapshot is only served while the stamp is
//! unchanged, so writes made through another `App` or another process on the
//! same database file are never hidden. Successful mutations also call
//! [`SnapshotCache::invalidate`] to drop the entry outright.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use crate::managers::bookmark_store::BookmarkStore;
use crate::types::bookmark::{Bookmark, BookmarkColumn};
use crate::types::errors::StoreError;
use crate::types::filter::Filter;

struct Snapshot {
    version: u64,
    bookmarks: Vec<Bookmark>,
}

#[derive(Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<String, Snapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Snapshot>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The cached snapshot, if one was stored at exactly `version`.
    pub fn get(&self, user_id: &str, version: u64) -> Option<Vec<Bookmark>> {
        self.lock()
            .get(user_id)
            .filter(|s| s.version == version)
            .map(|s| s.bookmarks.clone())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.lock().contains_key(user_id)
    }

    /// Stores a snapshot read at store version `version`.
    pub fn put(&self, user_id: &str, bookmarks: Vec<Bookmark>, version: u64) {
        self.lock()
            .insert(user_id.to_string(), Snapshot { version, bookmarks });
    }

    /// Drops the cached snapshot for a user.
    pub fn invalidate(&self, user_id: &str) {
        self.lock().remove(user_id);
        trace!(user_id, "snapshot invalidated");
    }

    /// Returns the cached snapshot if the store has not changed since it was
    /// read, otherwise queries the store and caches the result.
    pub async fn get_or_load(
        &self,
        user_id: &str,
        store: &dyn BookmarkStore,
    ) -> Result<Vec<Bookmark>, StoreError> {
        // Read the stamp before the rows: a write landing in between leaves the
        // entry tagged too old, which only costs a reload.
        let version = store.version(user_id).await?;
        if let Some(hit) = self.get(user_id, version) {
            trace!(user_id, version, "snapshot hit");
            return Ok(hit);
        }
        let rows = store
            .query(&Filter::new().eq(BookmarkColumn::UserId, user_id))
            .await?;
        self.put(user_id, rows.clone(), version);
        Ok(rows)
    }
}
