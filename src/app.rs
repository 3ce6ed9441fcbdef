//! App context for Smartmarks.
//!
//! Holds the process-wide collaborators (database, auth, change feed, store,
//! snapshot cache) and hands out per-session gateways and views. Nothing here
//! is global: every view and gateway is built from an explicit `&App`.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::database::connection::Database;
use crate::managers::bookmark_store::{BookmarkStore, SqliteBookmarkStore};
use crate::managers::mutation_gateway::MutationGateway;
use crate::managers::reconciled_view::ReconciledView;
use crate::services::auth_service::{AuthService, SessionAuth};
use crate::services::change_feed::ChangeFeed;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::snapshot_cache::SnapshotCache;
use crate::types::bookmark::Bookmark;
use crate::types::errors::{FeedError, PageError};

/// What the home page is rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub user_id: String,
    pub user_name: String,
    pub bookmarks: Vec<Bookmark>,
}

pub struct App {
    pub db: Arc<Database>,
    pub settings: Mutex<SettingsEngine>,
    pub auth: Arc<AuthService>,
    pub feed: Arc<ChangeFeed>,
    pub store: Arc<dyn BookmarkStore>,
    pub snapshots: Arc<SnapshotCache>,
}

impl App {
    /// Creates an App over the database at `db_path`, with default settings.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open(db_path)?;
        Ok(Self::assemble(db, SettingsEngine::new(None)))
    }

    /// Creates an App from loaded settings, opening the configured database.
    pub fn with_settings(settings: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let path = settings.database_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&path)?;
        info!(path = %path.display(), "database opened");
        Ok(Self::assemble(db, settings))
    }

    /// Creates an App over an in-memory database.
    pub fn in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open_in_memory()?;
        Ok(Self::assemble(db, SettingsEngine::new(None)))
    }

    fn assemble(db: Database, settings: SettingsEngine) -> Self {
        let db = Arc::new(db);
        let feed = ChangeFeed::new();
        let auth = Arc::new(AuthService::new(db.clone(), &settings.get_settings().auth));
        let settings = Mutex::new(settings);
        let store: Arc<dyn BookmarkStore> =
            Arc::new(SqliteBookmarkStore::new(db.clone(), feed.clone()));

        Self {
            db,
            settings,
            auth,
            feed,
            store,
            snapshots: Arc::new(SnapshotCache::new()),
        }
    }

    /// The settings engine. Changes are saved at once and take effect on the
    /// next start.
    pub fn settings(&self) -> MutexGuard<'_, SettingsEngine> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A gateway acting for whoever holds `token`.
    pub fn gateway(&self, token: Option<&str>) -> MutationGateway {
        let auth = Arc::new(SessionAuth::new(
            self.auth.clone(),
            token.map(str::to_string),
        ));
        MutationGateway::new(auth, self.store.clone(), self.snapshots.clone())
    }

    /// Loads the home page: the signed-in user and their bookmarks, newest first.
    pub async fn load_home(&self, token: Option<&str>) -> Result<HomePage, PageError> {
        let user = match token {
            Some(token) => self.auth.get_user(token).map_err(|e| {
                warn!(error = %e, "session lookup failed");
                PageError::Unauthenticated
            })?,
            None => None,
        }
        .ok_or(PageError::Unauthenticated)?;

        let bookmarks = self
            .snapshots
            .get_or_load(&user.id, self.store.as_ref())
            .await
            .map_err(|e| PageError::Load(e.to_string()))?;

        Ok(HomePage {
            user_name: user.display_name().to_string(),
            user_id: user.id,
            bookmarks,
        })
    }

    /// Opens a live view seeded from a loaded page.
    pub fn open_view(&self, page: &HomePage) -> Result<ReconciledView, FeedError> {
        ReconciledView::open(&self.feed, &page.user_id, page.bookmarks.clone())
    }
}
