//! Reconciled bookmark view.
//!
//! Owns the newest-first list a signed-in client displays and merges three
//! inputs into it:
//!
//! - the snapshot the view was seeded with,
//! - the outcome of local mutations (deletes are applied optimistically and
//!   rolled back on failure),
//! - the change feed, which may replay what this view already applied.
//!
//! # Invariants
//!
//! - No two entries share an id after any operation.
//! - Entries are ordered by `created_at`, descending.
//!
//! Mutations are split into a `begin_*` step that updates local state and a
//! `finish_*` step that applies the gateway's result, so change events can be
//! handled while a call is in flight:
//!
//! ```text
//! begin_delete(id) ──▶ [B3, B2]            (B1 removed, snapshot kept)
//!       │  on_change_event(..) may run here
//!       ▼
//! finish_delete(pending, Err(..)) ──▶ [B3, B2, B1]
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::managers::mutation_gateway::MutationGateway;
use crate::services::change_feed::{ChangeFeed, Subscription, BOOKMARKS_TABLE};
use crate::types::bookmark::{Bookmark, BookmarkColumn};
use crate::types::errors::{FeedError, GatewayError};
use crate::types::event::{ChangeEvent, ChangeKind};
use crate::types::filter::Filter;

/// Contents of the add-bookmark form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub title: String,
    pub url: String,
}

impl FormState {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.url.is_empty()
    }
}

/// An in-flight create. Holding one means the view is busy.
#[derive(Debug)]
pub struct PendingCreate {
    title: String,
    url: String,
}

impl PendingCreate {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// An optimistic delete awaiting the gateway, with the list as it was before.
#[derive(Debug)]
pub struct PendingDelete {
    id: String,
    snapshot: Vec<Bookmark>,
}

impl PendingDelete {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The list that a rollback restores.
    pub fn snapshot(&self) -> &[Bookmark] {
        &self.snapshot
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The store accepted the row; it will appear through the change feed.
    Created(Bookmark),
    /// The gateway refused; the form keeps its contents.
    Failed(GatewayError),
    /// Another create was still in flight.
    Rejected,
    /// The view was torn down before the call resolved.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The optimistic removal stands.
    Committed,
    /// The prior list was restored.
    RolledBack(GatewayError),
    /// The view was torn down before the call resolved.
    Discarded,
}

/// What a change event did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    Inserted,
    Removed,
    /// INSERT for an id that is already listed.
    Duplicate,
    /// DELETE for an id that is not listed.
    Absent,
    /// Event kind or table the view does not handle, or a malformed event.
    Ignored,
}

pub struct ReconciledView {
    user_id: String,
    bookmarks: Vec<Bookmark>,
    busy: bool,
    form: FormState,
    alerts: VecDeque<String>,
    subscription: Option<Subscription>,
    torn_down: bool,
}

impl ReconciledView {
    /// Opens a live view for `user_id`, subscribed to that user's rows.
    pub fn open(
        feed: &Arc<ChangeFeed>,
        user_id: &str,
        snapshot: Vec<Bookmark>,
    ) -> Result<Self, FeedError> {
        let filter = Filter::new().eq(BookmarkColumn::UserId, user_id);
        let subscription = feed.subscribe(BOOKMARKS_TABLE, &filter.to_string())?;
        let mut view = Self::detached(user_id, snapshot);
        view.subscription = Some(subscription);
        Ok(view)
    }

    /// A view with no change-feed subscription; events are fed in through
    /// [`ReconciledView::on_change_event`].
    pub fn detached(user_id: &str, snapshot: Vec<Bookmark>) -> Self {
        Self {
            user_id: user_id.to_string(),
            bookmarks: normalize(snapshot),
            busy: false,
            form: FormState::default(),
            alerts: VecDeque::new(),
            subscription: None,
            torn_down: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn ids(&self) -> Vec<&str> {
        self.bookmarks.iter().map(|b| b.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bookmarks.iter().any(|b| b.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Updates the form as the user types.
    pub fn set_form(&mut self, title: &str, url: &str) {
        self.form.title = title.to_string();
        self.form.url = url.to_string();
    }

    /// True while the change-feed subscription is held.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Pops the oldest message waiting to be shown to the user.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    fn alert(&mut self, message: String) {
        self.alerts.push_back(message);
    }

    /// Replaces the list with a freshly loaded snapshot, as if the view had just
    /// been opened. The subscription, form and busy flag are kept.
    pub fn reseed(&mut self, snapshot: Vec<Bookmark>) {
        self.bookmarks = normalize(snapshot);
        debug!(user_id = %self.user_id, count = self.bookmarks.len(), "view reseeded");
    }

    // ── Change feed ──────────────────────────────────────────────────────

    /// Applies one change-feed event. Idempotent: replays and deletes of absent
    /// rows leave the list untouched.
    pub fn on_change_event(&mut self, event: &ChangeEvent) -> EventEffect {
        if self.torn_down || event.table != BOOKMARKS_TABLE {
            return EventEffect::Ignored;
        }
        let effect = match (event.kind, event.row()) {
            (ChangeKind::Insert, Some(row)) => self.apply_insert(row),
            (ChangeKind::Delete, Some(row)) => self.apply_delete(&row.id),
            _ => EventEffect::Ignored,
        };
        trace!(kind = ?event.kind, effect = ?effect, "change event applied");
        effect
    }

    fn apply_insert(&mut self, row: &Bookmark) -> EventEffect {
        if self.contains(&row.id) {
            return EventEffect::Duplicate;
        }
        // Usually index 0: a fresh insert carries the newest timestamp.
        let at = self
            .bookmarks
            .iter()
            .position(|b| b.created_at < row.created_at)
            .unwrap_or(self.bookmarks.len());
        self.bookmarks.insert(at, row.clone());
        EventEffect::Inserted
    }

    fn apply_delete(&mut self, id: &str) -> EventEffect {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        if self.bookmarks.len() == before {
            EventEffect::Absent
        } else {
            EventEffect::Removed
        }
    }

    /// Applies every event already delivered to the subscription, without
    /// waiting. Returns how many events changed the list.
    pub fn pump(&mut self) -> usize {
        let mut changed = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            if matches!(
                self.on_change_event(&event),
                EventEffect::Inserted | EventEffect::Removed
            ) {
                changed += 1;
            }
        }
        changed
    }

    /// Waits for the next change-feed event. Without a subscription this never
    /// resolves, so it is safe to use as a `select!` branch.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        match self.subscription.as_mut() {
            Some(sub) => sub.recv().await,
            None => std::future::pending().await,
        }
    }

    // ── Create ───────────────────────────────────────────────────────────

    /// Marks the view busy and records the form contents. Returns `None` if a
    /// create is already in flight or the view is gone.
    pub fn begin_create(&mut self, title: &str, url: &str) -> Option<PendingCreate> {
        if self.busy || self.torn_down {
            return None;
        }
        self.busy = true;
        self.set_form(title, url);
        Some(PendingCreate {
            title: title.to_string(),
            url: url.to_string(),
        })
    }

    /// Applies a create result. The list is not touched on success; the row
    /// arrives through the change feed.
    pub fn finish_create(
        &mut self,
        pending: PendingCreate,
        result: Result<Bookmark, GatewayError>,
    ) -> CreateOutcome {
        if self.torn_down {
            debug!(title = %pending.title, "create resolved after teardown");
            return CreateOutcome::Discarded;
        }
        self.busy = false;
        match result {
            Ok(bookmark) => {
                self.form = FormState::default();
                CreateOutcome::Created(bookmark)
            }
            Err(e) => {
                warn!(error = %e, "create failed");
                self.alert(e.to_string());
                CreateOutcome::Failed(e)
            }
        }
    }

    /// Runs a full create through the gateway.
    pub async fn submit_create(
        &mut self,
        gateway: &MutationGateway,
        title: &str,
        url: &str,
    ) -> CreateOutcome {
        let Some(pending) = self.begin_create(title, url) else {
            return CreateOutcome::Rejected;
        };
        let result = gateway.create(pending.title(), pending.url()).await;
        self.finish_create(pending, result)
    }

    // ── Delete ───────────────────────────────────────────────────────────

    /// Removes `id` optimistically, keeping the current list for rollback.
    /// Returns `None` once the view is torn down.
    pub fn begin_delete(&mut self, id: &str) -> Option<PendingDelete> {
        if self.torn_down {
            return None;
        }
        let snapshot = self.bookmarks.clone();
        self.bookmarks.retain(|b| b.id != id);
        Some(PendingDelete {
            id: id.to_string(),
            snapshot,
        })
    }

    /// Applies a delete result: on failure the exact prior list comes back.
    pub fn finish_delete(
        &mut self,
        pending: PendingDelete,
        result: Result<(), GatewayError>,
    ) -> DeleteOutcome {
        if self.torn_down {
            debug!(id = %pending.id, "delete resolved after teardown");
            return DeleteOutcome::Discarded;
        }
        match result {
            Ok(()) => DeleteOutcome::Committed,
            Err(e) => {
                warn!(id = %pending.id, error = %e, "delete failed, rolling back");
                self.bookmarks = pending.snapshot;
                self.alert(e.to_string());
                DeleteOutcome::RolledBack(e)
            }
        }
    }

    /// Runs a full optimistic delete through the gateway.
    pub async fn submit_delete(&mut self, gateway: &MutationGateway, id: &str) -> DeleteOutcome {
        let Some(pending) = self.begin_delete(id) else {
            return DeleteOutcome::Discarded;
        };
        let result = gateway.delete(pending.id()).await;
        self.finish_delete(pending, result)
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    /// Releases the change-feed subscription. Later mutation results are
    /// discarded.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.subscription = None;
        debug!(user_id = %self.user_id, "view torn down");
    }
}

/// Sorts newest first and drops repeated ids, keeping the first occurrence.
fn normalize(mut bookmarks: Vec<Bookmark>) -> Vec<Bookmark> {
    bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let mut seen = HashSet::new();
    bookmarks.retain(|b| seen.insert(b.id.clone()));
    bookmarks
}
