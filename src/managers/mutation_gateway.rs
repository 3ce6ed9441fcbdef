//! Mutation gateway: validates create/delete requests and forwards them to the
//! store on behalf of the signed-in user.
//!
//! The owner is always resolved through the [`AuthProvider`], never taken from
//! the caller. Deletes are scoped by the conjunction `id = ? AND user_id = ?`,
//! which is what stops one user from deleting another user's rows.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::managers::bookmark_store::BookmarkStore;
use crate::services::auth_service::AuthProvider;
use crate::services::snapshot_cache::SnapshotCache;
use crate::types::bookmark::{Bookmark, BookmarkColumn, NewBookmark};
use crate::types::errors::GatewayError;
use crate::types::filter::Filter;

/// Message shown when a required field is blank.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Title and URL are required";

#[derive(Clone)]
pub struct MutationGateway {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn BookmarkStore>,
    snapshots: Arc<SnapshotCache>,
}

impl MutationGateway {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn BookmarkStore>,
        snapshots: Arc<SnapshotCache>,
    ) -> Self {
        Self {
            auth,
            store,
            snapshots,
        }
    }

    /// Creates a bookmark owned by the current user.
    ///
    /// Fails with `Unauthenticated` without a session, `InvalidInput` when the
    /// title or URL is blank (before any store call), and `StoreError` with the
    /// store's message otherwise. URL format is not checked.
    pub async fn create(&self, title: &str, url: &str) -> Result<Bookmark, GatewayError> {
        let identity = self
            .auth
            .current_identity()
            .await
            .ok_or(GatewayError::Unauthenticated)?;

        let (title, url) = (title.trim(), url.trim());
        if title.is_empty() || url.is_empty() {
            return Err(GatewayError::InvalidInput(REQUIRED_FIELDS_MESSAGE.to_string()));
        }

        let record = NewBookmark {
            title: title.to_string(),
            url: url.to_string(),
            user_id: identity.id.clone(),
        };
        let bookmark = self.store.insert(record).await.map_err(|e| {
            warn!(user_id = %identity.id, error = %e, "bookmark insert failed");
            GatewayError::from(e)
        })?;

        self.snapshots.invalidate(&identity.id);
        info!(id = %bookmark.id, user_id = %identity.id, "bookmark created");
        Ok(bookmark)
    }

    /// Deletes a bookmark owned by the current user. Succeeds whether or not a
    /// row matched.
    pub async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let identity = self
            .auth
            .current_identity()
            .await
            .ok_or(GatewayError::Unauthenticated)?;

        let filter = Filter::new()
            .eq(BookmarkColumn::Id, id)
            .eq(BookmarkColumn::UserId, identity.id.as_str());
        let removed = self.store.delete(&filter).await.map_err(|e| {
            warn!(id, user_id = %identity.id, error = %e, "bookmark delete failed");
            GatewayError::from(e)
        })?;

        self.snapshots.invalidate(&identity.id);
        debug!(id, user_id = %identity.id, removed, "bookmark delete resolved");
        Ok(())
    }
}
