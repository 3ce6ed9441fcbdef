//! Unit tests for the SQLite bookmark store and the change events it publishes.

use std::sync::Arc;

use smartmarks::database::Database;
use smartmarks::managers::bookmark_store::{BookmarkStore, SqliteBookmarkStore};
use smartmarks::services::auth_service::AuthService;
use smartmarks::services::change_feed::{ChangeFeed, BOOKMARKS_TABLE};
use smartmarks::types::bookmark::{BookmarkColumn, NewBookmark};
use smartmarks::types::errors::StoreError;
use smartmarks::types::event::ChangeKind;
use smartmarks::types::filter::Filter;
use smartmarks::types::settings::AuthSettings;

struct Fixture {
    feed: Arc<ChangeFeed>,
    store: SqliteBookmarkStore,
    alice: String,
    bob: String,
}

fn setup() -> Fixture {
    let db = Arc::new(Database::open_in_memory().expect("Failed to open in-memory database"));
    let auth = AuthService::new(db.clone(), &AuthSettings::default());
    let alice = auth.register_user("alice@example.com", Some("Alice")).unwrap().id;
    let bob = auth.register_user("bob@example.com", None).unwrap().id;
    let feed = ChangeFeed::new();
    let store = SqliteBookmarkStore::new(db, feed.clone());
    Fixture { feed, store, alice, bob }
}

fn new_bookmark(title: &str, user_id: &str) -> NewBookmark {
    NewBookmark {
        title: title.to_string(),
        url: format!("https://{}.example", title.to_lowercase()),
        user_id: user_id.to_string(),
    }
}

fn owned_by(user_id: &str) -> Filter {
    Filter::new().eq(BookmarkColumn::UserId, user_id)
}

#[tokio::test]
async fn test_insert_assigns_id_and_increasing_timestamps() {
    let fx = setup();
    let first = fx.store.insert(new_bookmark("One", &fx.alice)).await.unwrap();
    let second = fx.store.insert(new_bookmark("Two", &fx.alice)).await.unwrap();

    assert!(!first.id.is_empty());
    assert_ne!(first.id, second.id);
    assert!(second.created_at > first.created_at);
    assert_eq!(first.user_id, fx.alice);
}

#[tokio::test]
async fn test_query_is_newest_first_and_scoped_to_owner() {
    let fx = setup();
    let a1 = fx.store.insert(new_bookmark("A1", &fx.alice)).await.unwrap();
    fx.store.insert(new_bookmark("B1", &fx.bob)).await.unwrap();
    let a2 = fx.store.insert(new_bookmark("A2", &fx.alice)).await.unwrap();

    let rows = fx.store.query(&owned_by(&fx.alice)).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|b| b.id.clone()).collect();
    assert_eq!(ids, vec![a2.id, a1.id]);
}

#[tokio::test]
async fn test_delete_of_other_users_row_is_a_noop() {
    let fx = setup();
    let bobs = fx.store.insert(new_bookmark("Secret", &fx.bob)).await.unwrap();

    let filter = Filter::new()
        .eq(BookmarkColumn::Id, bobs.id.as_str())
        .eq(BookmarkColumn::UserId, fx.alice.as_str());
    let removed = fx.store.delete(&filter).await.unwrap();

    assert_eq!(removed, 0);
    assert_eq!(fx.store.query(&owned_by(&fx.bob)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let fx = setup();
    let bm = fx.store.insert(new_bookmark("Once", &fx.alice)).await.unwrap();
    let filter = Filter::new()
        .eq(BookmarkColumn::Id, bm.id.as_str())
        .eq(BookmarkColumn::UserId, fx.alice.as_str());

    assert_eq!(fx.store.delete(&filter).await.unwrap(), 1);
    assert_eq!(fx.store.delete(&filter).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unscoped_delete_is_rejected() {
    let fx = setup();
    fx.store.insert(new_bookmark("Keep", &fx.alice)).await.unwrap();
    let err = fx.store.delete(&Filter::new()).await.unwrap_err();
    assert_eq!(err, StoreError::UnscopedDelete);
    assert_eq!(fx.store.query(&owned_by(&fx.alice)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_insert_and_delete_publish_to_matching_subscribers() {
    let fx = setup();
    let mut alice_sub = fx
        .feed
        .subscribe(BOOKMARKS_TABLE, &format!("user_id=eq.{}", fx.alice))
        .unwrap();
    let mut bob_sub = fx
        .feed
        .subscribe(BOOKMARKS_TABLE, &format!("user_id=eq.{}", fx.bob))
        .unwrap();

    let bm = fx.store.insert(new_bookmark("Live", &fx.alice)).await.unwrap();
    let filter = Filter::new()
        .eq(BookmarkColumn::Id, bm.id.as_str())
        .eq(BookmarkColumn::UserId, fx.alice.as_str());
    fx.store.delete(&filter).await.unwrap();

    let inserted = alice_sub.try_recv().expect("insert event");
    assert_eq!(inserted.kind, ChangeKind::Insert);
    assert_eq!(inserted.new.as_ref().map(|b| b.id.as_str()), Some(bm.id.as_str()));

    let deleted = alice_sub.try_recv().expect("delete event");
    assert_eq!(deleted.kind, ChangeKind::Delete);
    assert_eq!(deleted.old.as_ref().map(|b| b.id.as_str()), Some(bm.id.as_str()));

    assert!(alice_sub.try_recv().is_none());
    assert!(bob_sub.try_recv().is_none(), "other users must not see the rows");
}

#[tokio::test]
async fn test_noop_delete_publishes_nothing() {
    let fx = setup();
    let mut sub = fx
        .feed
        .subscribe(BOOKMARKS_TABLE, &format!("user_id=eq.{}", fx.alice))
        .unwrap();
    let filter = Filter::new()
        .eq(BookmarkColumn::Id, "missing")
        .eq(BookmarkColumn::UserId, fx.alice.as_str());
    assert_eq!(fx.store.delete(&filter).await.unwrap(), 0);
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_insert_for_unknown_user_fails() {
    let fx = setup();
    let err = fx.store.insert(new_bookmark("Orphan", "nobody")).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}
