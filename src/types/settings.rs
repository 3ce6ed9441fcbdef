use serde::{Deserialize, Serialize};

/// Top-level application settings, persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub rpc: RpcSettings,
    pub logging: LoggingSettings,
}

/// Where the SQLite file lives. `None` means `<data dir>/smartmarks.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
    /// Lifetime of a one-time login code.
    pub code_ttl_secs: i64,
    /// Lifetime of a session token.
    pub session_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            code_ttl_secs: 300,
            session_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RpcSettings {
    /// Per-connection request budget.
    pub max_requests_per_second: u32,
    /// TCP address to serve many connections from one process, sharing one
    /// change feed. `None` serves a single session over stdin/stdout.
    pub listen: Option<String>,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_requests_per_second: 200,
            listen: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
