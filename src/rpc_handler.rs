//! RPC method handler for the Smartmarks JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdio.
//! [`handle_method`] dispatches one call against the [`App`] and the caller's
//! [`RpcSession`] (session token plus the open view, if any).

use serde_json::{json, Value};
use tracing::debug;

use crate::app::App;
use crate::managers::reconciled_view::{CreateOutcome, DeleteOutcome, ReconciledView};
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::event::ChangeEvent;

/// Origin used for callback redirects when the client does not send one.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Per-connection state: who is signed in and what they are looking at.
#[derive(Default)]
pub struct RpcSession {
    token: Option<String>,
    view: Option<ReconciledView>,
}

impl RpcSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn view(&self) -> Option<&ReconciledView> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut ReconciledView> {
        self.view.as_mut()
    }

    /// Tears down and drops the open view, releasing its subscription.
    pub fn close_view(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.teardown();
        }
    }

    /// Waits for the open view's next change event; never resolves without a view.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        match self.view.as_mut() {
            Some(view) => view.next_event().await,
            None => std::future::pending().await,
        }
    }
}

/// The view's list in wire form.
pub fn items_json(view: &ReconciledView) -> Value {
    json!(view.bookmarks())
}

fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

/// Settings are only visible to a signed-in caller.
fn require_signed_in(app: &App, session: &RpcSession) -> Result<(), String> {
    let token = session.token().ok_or_else(|| "Unauthorized".to_string())?;
    match app.auth.get_user(token) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err("Unauthorized".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn open_view_mut(session: &mut RpcSession) -> Result<&mut ReconciledView, String> {
    session
        .view
        .as_mut()
        .ok_or_else(|| "no open view: call page.home first".to_string())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with a user-facing message.
pub async fn handle_method(
    app: &App,
    session: &mut RpcSession,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    debug!(method, "rpc call");
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Auth ───
        "auth.register" => {
            let email = require_str(params, "email")?;
            let full_name = params.get("full_name").and_then(|v| v.as_str());
            let user = app
                .auth
                .register_user(email, full_name)
                .map_err(|e| e.to_string())?;
            Ok(json!(user))
        }
        "auth.issue_code" => {
            let user_id = require_str(params, "user_id")?;
            let code = app.auth.issue_code(user_id).map_err(|e| e.to_string())?;
            Ok(json!({"code": code}))
        }
        "auth.callback" => {
            let origin = params
                .get("origin")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_ORIGIN);
            let code = params.get("code").and_then(|v| v.as_str());
            let next = params.get("next").and_then(|v| v.as_str());
            let outcome = app.auth.handle_callback(origin, code, next);
            match outcome.session {
                Some(s) => {
                    session.close_view();
                    session.token = Some(s.token.clone());
                    Ok(json!({
                        "redirect": outcome.redirect,
                        "token": s.token,
                        "user": s.user,
                        "expires_at": s.expires_at,
                    }))
                }
                None => Ok(json!({"redirect": outcome.redirect})),
            }
        }
        "auth.sign_out" => {
            if let Some(token) = session.token.take() {
                app.auth.sign_out(&token).map_err(|e| e.to_string())?;
            }
            session.close_view();
            Ok(json!({"ok": true, "redirect": "/login"}))
        }

        // ─── Page ───
        "page.home" => {
            let page = match app.load_home(session.token()).await {
                Ok(page) => page,
                Err(e) => match e.redirect() {
                    Some(to) => {
                        session.close_view();
                        return Ok(json!({"redirect": to}));
                    }
                    None => return Err(e.to_string()),
                },
            };

            // A reload of the same user's page reseeds the live view in place.
            let same_user = matches!(
                session.view(),
                Some(view) if view.user_id() == page.user_id && !view.is_torn_down()
            );
            if same_user {
                if let Some(view) = session.view.as_mut() {
                    view.reseed(page.bookmarks.clone());
                }
            } else {
                let view = app.open_view(&page).map_err(|e| e.to_string())?;
                session.close_view();
                session.view = Some(view);
            }
            Ok(json!({
                "user_id": page.user_id,
                "user_name": page.user_name,
                "items": page.bookmarks,
            }))
        }
        "view.close" => {
            session.close_view();
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => {
            require_signed_in(app, session)?;
            let settings = app.settings().get_settings().clone();
            serde_json::to_value(settings).map_err(|e| e.to_string())
        }
        "settings.set" => {
            require_signed_in(app, session)?;
            let key = require_str(params, "key")?;
            let value = params
                .get("value")
                .cloned()
                .ok_or_else(|| "missing value".to_string())?;
            app.settings()
                .set_value(key, value)
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "applies": "restart"}))
        }
        "settings.reset" => {
            require_signed_in(app, session)?;
            app.settings().reset().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "applies": "restart"}))
        }

        // ─── Bookmarks ───
        "bookmark.add" => {
            let title = require_str(params, "title")?;
            let url = require_str(params, "url")?;
            let gateway = app.gateway(session.token());
            let view = open_view_mut(session)?;
            match view.submit_create(&gateway, title, url).await {
                CreateOutcome::Created(b) => Ok(json!({"id": b.id, "title": b.title, "url": b.url})),
                CreateOutcome::Failed(e) => Err(e.to_string()),
                CreateOutcome::Rejected => Err("a bookmark is already being added".to_string()),
                CreateOutcome::Discarded => Err("view closed".to_string()),
            }
        }
        "bookmark.delete" => {
            let id = require_str(params, "id")?;
            let gateway = app.gateway(session.token());
            let view = open_view_mut(session)?;
            match view.submit_delete(&gateway, id).await {
                DeleteOutcome::Committed => Ok(json!({"ok": true})),
                DeleteOutcome::RolledBack(e) => Err(e.to_string()),
                DeleteOutcome::Discarded => Err("view closed".to_string()),
            }
        }
        "bookmark.list" => {
            let view = open_view_mut(session)?;
            view.pump();
            Ok(json!({
                "items": items_json(view),
                "count": view.len(),
                "busy": view.is_busy(),
            }))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
