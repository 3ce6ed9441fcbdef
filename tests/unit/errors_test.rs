use smartmarks::types::errors::*;

// === GatewayError Tests ===

#[test]
fn gateway_error_display_variants() {
    assert_eq!(GatewayError::Unauthenticated.to_string(), "Unauthorized");
    assert_eq!(
        GatewayError::InvalidInput("Title and URL are required".to_string()).to_string(),
        "Title and URL are required"
    );
    assert_eq!(
        GatewayError::StoreError("disk I/O error".to_string()).to_string(),
        "disk I/O error"
    );
}

#[test]
fn gateway_error_wraps_store_message_verbatim() {
    let store = StoreError::Database("constraint failed".to_string());
    assert_eq!(
        GatewayError::from(store).to_string(),
        "constraint failed",
        "the store's own message reaches the user unprefixed"
    );
    assert_eq!(
        GatewayError::from(StoreError::UnscopedDelete),
        GatewayError::StoreError("Refusing to delete without a filter".to_string())
    );
}

#[test]
fn gateway_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(GatewayError::Unauthenticated);
    assert!(err.source().is_none());
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Database("locked".to_string()).to_string(),
        "Bookmark database error: locked"
    );
    assert_eq!(
        StoreError::UnscopedDelete.to_string(),
        "Refusing to delete without a filter"
    );
}

// === AuthError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(AuthError::Unauthenticated.to_string(), "Unauthorized");
    assert_eq!(AuthError::InvalidCode.to_string(), "Invalid or expired login code");
    assert_eq!(
        AuthError::InvalidEmail("nobody".to_string()).to_string(),
        "Invalid email: nobody"
    );
    assert_eq!(
        AuthError::Database("busy".to_string()).to_string(),
        "Auth database error: busy"
    );
    assert_eq!(
        AuthError::TokenGeneration("no entropy".to_string()).to_string(),
        "Token generation failed: no entropy"
    );
}

// === FeedError Tests ===

#[test]
fn feed_error_display_variants() {
    assert_eq!(
        FeedError::InvalidFilter("user_id".to_string()).to_string(),
        "Invalid filter expression: user_id"
    );
    assert_eq!(
        FeedError::UnknownTable("users".to_string()).to_string(),
        "Unknown table: users"
    );
}

// === PageError Tests ===

#[test]
fn page_error_redirects_only_when_unauthenticated() {
    assert_eq!(PageError::Unauthenticated.redirect(), Some("/login"));
    assert_eq!(PageError::Load("x".to_string()).redirect(), None);
    assert_eq!(
        PageError::Load("x".to_string()).to_string(),
        "Failed to load bookmarks: x"
    );
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("denied".to_string()).to_string(),
        "Settings I/O error: denied"
    );
    assert_eq!(
        SettingsError::SerializationError("eof".to_string()).to_string(),
        "Settings serialization error: eof"
    );
    assert_eq!(
        SettingsError::InvalidKey("a.b".to_string()).to_string(),
        "Invalid settings key: a.b"
    );
    assert_eq!(
        SettingsError::InvalidValue("nan".to_string()).to_string(),
        "Invalid settings value: nan"
    );
}
