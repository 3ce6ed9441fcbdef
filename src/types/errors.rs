use std::fmt;

// === GatewayError ===

/// Errors returned by the mutation gateway. Every create/delete failure is
/// one of these; nothing is thrown past the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No valid session identity is available.
    Unauthenticated,
    /// A required field was empty; no store call was made.
    InvalidInput(String),
    /// The store rejected the operation. The message is passed through verbatim.
    StoreError(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unauthenticated => write!(f, "Unauthorized"),
            GatewayError::InvalidInput(msg) => write!(f, "{}", msg),
            GatewayError::StoreError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(msg) => GatewayError::StoreError(msg),
            other => GatewayError::StoreError(other.to_string()),
        }
    }
}

// === StoreError ===

/// Errors from the relational bookmark store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database operation failed.
    Database(String),
    /// A delete was attempted without any filter clause.
    UnscopedDelete,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Bookmark database error: {}", msg),
            StoreError::UnscopedDelete => write!(f, "Refusing to delete without a filter"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

// === AuthError ===

/// Errors from the authentication service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No valid session for the request.
    Unauthenticated,
    /// The login code is unknown, already used, or expired.
    InvalidCode,
    /// The email address is empty or malformed.
    InvalidEmail(String),
    /// Database operation failed.
    Database(String),
    /// Random token generation failed.
    TokenGeneration(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "Unauthorized"),
            AuthError::InvalidCode => write!(f, "Invalid or expired login code"),
            AuthError::InvalidEmail(email) => write!(f, "Invalid email: {}", email),
            AuthError::Database(msg) => write!(f, "Auth database error: {}", msg),
            AuthError::TokenGeneration(msg) => write!(f, "Token generation failed: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Database(e.to_string())
    }
}

// === FeedError ===

/// Errors from the realtime change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The subscription filter expression could not be parsed.
    InvalidFilter(String),
    /// The subscription names a table the feed does not publish.
    UnknownTable(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::InvalidFilter(expr) => write!(f, "Invalid filter expression: {}", expr),
            FeedError::UnknownTable(table) => write!(f, "Unknown table: {}", table),
        }
    }
}

impl std::error::Error for FeedError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

// === PageError ===

/// Errors from loading the home page snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// No valid session; the client should be sent to the login page.
    Unauthenticated,
    /// The snapshot query failed.
    Load(String),
}

impl PageError {
    /// Where the client should go instead of the page, if anywhere.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            PageError::Unauthenticated => Some("/login"),
            PageError::Load(_) => None,
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::Unauthenticated => write!(f, "Unauthorized"),
            PageError::Load(msg) => write!(f, "Failed to load bookmarks: {}", msg),
        }
    }
}

impl std::error::Error for PageError {}
