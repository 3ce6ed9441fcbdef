//! Realtime change feed for Smartmarks.
//!
//! Each subscriber gets its own unbounded `mpsc` channel; [`ChangeFeed::publish`]
//! fans a row-level event out to every subscriber whose table and filter match.
//! The receiving side is the sole consumer, which keeps tests deterministic:
//! publish a synthetic event, then drain the [`Subscription`].
//!
//! ```text
//!   SqliteBookmarkStore ──publish──▶ ChangeFeed ──mpsc──▶ Subscription (view)
//!                                        │
//!                                        └──────mpsc──▶ Subscription (other tab)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::types::errors::FeedError;
use crate::types::event::ChangeEvent;
use crate::types::filter::Filter;

/// The only table the feed publishes.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// Identifies one live subscription.
pub type SubscriptionId = u64;

struct Subscriber {
    table: String,
    filter: Filter,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

/// Registry of live subscriptions.
pub struct ChangeFeed {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribes to row changes on `table` matching `filter_expr`
    /// (`column=eq.value`, clauses joined with `&`). At least one clause is
    /// required.
    pub fn subscribe(self: &Arc<Self>, table: &str, filter_expr: &str) -> Result<Subscription, FeedError> {
        if table != BOOKMARKS_TABLE {
            return Err(FeedError::UnknownTable(table.to_string()));
        }
        let filter = Filter::parse(filter_expr)?;
        // An empty filter would match every user's rows.
        if filter.is_empty() {
            return Err(FeedError::InvalidFilter(format!("'{}' has no clauses", filter_expr.trim())));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.registry().insert(
            id,
            Subscriber {
                table: table.to_string(),
                filter,
                tx,
            },
        );
        debug!(subscription = id, table, filter = filter_expr, "subscribed");

        Ok(Subscription {
            id,
            feed: Arc::downgrade(self),
            rx,
        })
    }

    /// Releases a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            debug!(subscription = id, "unsubscribed");
        }
        removed
    }

    /// Delivers `event` to every matching subscriber and returns how many
    /// received it. Subscribers whose receiver is gone are pruned.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let Some(row) = event.row() else {
            trace!(table = %event.table, "event without a row, not delivered");
            return 0;
        };

        let mut registry = self.registry();
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sub) in registry.iter() {
            if sub.table != event.table || !sub.filter.matches(row) {
                continue;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            registry.remove(&id);
        }
        trace!(kind = ?event.kind, id = %row.id, delivered, "published change");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    feed: Weak<ChangeFeed>,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Returns an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
