//! Authentication service for Smartmarks.
//!
//! Users sign in with a single-use login code (the OAuth-style callback flow):
//! a code is issued for a user, the callback exchanges it for a session token,
//! and every later request carries that token. Tokens are random and stored
//! only as SHA-256 hashes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::errors::AuthError;
use crate::types::identity::{Identity, Session};
use crate::types::settings::AuthSettings;

/// Random bytes in a login code.
const CODE_BYTES: usize = 16;

/// Random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// Where a failed callback sends the browser.
pub const AUTH_ERROR_PATH: &str = "/auth/auth-code-error";

/// Source of the identity every mutation acts on behalf of.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when there is no valid session.
    async fn current_identity(&self) -> Option<Identity>;
}

/// Result of the login callback: where to redirect, and the new session on success.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub redirect: String,
    pub session: Option<Session>,
}

/// Session and login-code management backed by SQLite.
pub struct AuthService {
    db: Arc<Database>,
    rng: SystemRandom,
    code_ttl_secs: i64,
    session_ttl_secs: i64,
}

impl AuthService {
    pub fn new(db: Arc<Database>, settings: &AuthSettings) -> Self {
        Self {
            db,
            rng: SystemRandom::new(),
            code_ttl_secs: settings.code_ttl_secs,
            session_ttl_secs: settings.session_ttl_secs,
        }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn random_token(&self, len: usize) -> Result<String, AuthError> {
        let mut buf = vec![0u8; len];
        self.rng
            .fill(&mut buf)
            .map_err(|_| AuthError::TokenGeneration("system RNG unavailable".to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(&buf))
    }

    fn hash_token(token: &str) -> String {
        URL_SAFE_NO_PAD.encode(digest(&SHA256, token.as_bytes()).as_ref())
    }

    fn user_by_id(conn: &Connection, user_id: &str) -> Result<Option<Identity>, AuthError> {
        let user = conn
            .query_row(
                "SELECT id, email, full_name FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(Identity {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Creates the user for `email`, or returns the existing one. A provided
    /// `full_name` replaces the stored one.
    pub fn register_user(&self, email: &str, full_name: Option<&str>) -> Result<Identity, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail(email));
        }
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO users (id, email, full_name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(email) DO UPDATE SET full_name = COALESCE(excluded.full_name, users.full_name)",
            params![Uuid::new_v4().to_string(), email, full_name, Self::now()],
        )?;
        let user = conn.query_row(
            "SELECT id, email, full_name FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(Identity {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                })
            },
        )?;
        Ok(user)
    }

    /// Issues a single-use login code for an existing user.
    pub fn issue_code(&self, user_id: &str) -> Result<String, AuthError> {
        let code = self.random_token(CODE_BYTES)?;
        let conn = self.db.connection();
        if Self::user_by_id(&conn, user_id)?.is_none() {
            return Err(AuthError::Unauthenticated);
        }
        conn.execute(
            "INSERT INTO auth_codes (code, user_id, expires_at, used) VALUES (?1, ?2, ?3, 0)",
            params![code, user_id, Self::now() + self.code_ttl_secs],
        )?;
        Ok(code)
    }

    /// Exchanges a login code for a session. The code is marked used in the same
    /// transaction that creates the session, so it can never be replayed.
    pub fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        let token = self.random_token(TOKEN_BYTES)?;
        let now = Self::now();
        let expires_at = now + self.session_ttl_secs;

        let mut conn = self.db.connection();
        let tx = conn.transaction()?;
        let row: Option<(String, i64, bool)> = tx
            .query_row(
                "SELECT user_id, expires_at, used FROM auth_codes WHERE code = ?1",
                params![code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let user_id = match row {
            Some((user_id, code_expires, false)) if code_expires > now => user_id,
            _ => return Err(AuthError::InvalidCode),
        };

        tx.execute("UPDATE auth_codes SET used = 1 WHERE code = ?1", params![code])?;
        tx.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![Self::hash_token(&token), user_id, now, expires_at],
        )?;
        let user = Self::user_by_id(&tx, &user_id)?.ok_or(AuthError::InvalidCode)?;
        tx.commit()?;

        Ok(Session {
            token,
            user,
            expires_at,
        })
    }

    /// Resolves a session token to its user. Expired or unknown tokens yield `None`.
    pub fn get_user(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        let conn = self.db.connection();
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
                params![Self::hash_token(token), Self::now()],
                |row| row.get(0),
            )
            .optional()?;
        match user_id {
            Some(id) => Self::user_by_id(&conn, &id),
            None => Ok(None),
        }
    }

    /// Ends a session. Returns `false` if the token was not active.
    pub fn sign_out(&self, token: &str) -> Result<bool, AuthError> {
        let affected = self.db.connection().execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            params![Self::hash_token(token)],
        )?;
        Ok(affected > 0)
    }

    /// Handles the login callback: exchanges `code` and redirects to `next`
    /// (default `/`) on success, or to the auth error page otherwise.
    pub fn handle_callback(&self, origin: &str, code: Option<&str>, next: Option<&str>) -> CallbackOutcome {
        // Only same-origin absolute paths are honored.
        let next = match next {
            Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
            _ => "/",
        };

        let Some(code) = code.filter(|c| !c.is_empty()) else {
            warn!("auth callback without a code");
            return CallbackOutcome {
                redirect: format!("{}{}", origin, AUTH_ERROR_PATH),
                session: None,
            };
        };

        match self.exchange_code_for_session(code) {
            Ok(session) => {
                info!(user_id = %session.user.id, next, "auth callback succeeded");
                CallbackOutcome {
                    redirect: format!("{}{}", origin, next),
                    session: Some(session),
                }
            }
            Err(e) => {
                warn!(error = %e, "auth callback failed");
                CallbackOutcome {
                    redirect: format!("{}{}", origin, AUTH_ERROR_PATH),
                    session: None,
                }
            }
        }
    }
}

/// [`AuthProvider`] bound to one client's session token.
pub struct SessionAuth {
    service: Arc<AuthService>,
    token: Option<String>,
}

impl SessionAuth {
    pub fn new(service: Arc<AuthService>, token: Option<String>) -> Self {
        Self { service, token }
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_identity(&self) -> Option<Identity> {
        let token = self.token.as_deref()?;
        match self.service.get_user(token) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                None
            }
        }
    }
}
