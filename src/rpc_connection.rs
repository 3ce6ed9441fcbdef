//! One Smartmarks JSON-RPC connection.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Push:     {"event":"bookmarks.changed","items":[...]} and {"event":"alert","message":"..."}
//!
//! [`serve_connection`] runs one session over any reader/writer pair: stdio
//! for a single client, or each accepted socket when many clients share one
//! [`App`] (and so one change feed).

use std::io;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::app::App;
use crate::managers::reconciled_view::EventEffect;
use crate::rpc_handler::{handle_method, items_json, RpcSession};

/// Simple rate limiter: max requests per second.
pub struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    pub fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Value) -> io::Result<()> {
    let mut line = frame.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

/// Writes any alerts the view raised, then the list if it changed.
async fn flush_view<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut RpcSession,
    changed: bool,
) -> io::Result<()> {
    let Some(view) = session.view_mut() else {
        return Ok(());
    };
    while let Some(message) = view.take_alert() {
        write_frame(writer, &json!({"event": "alert", "message": message})).await?;
    }
    if changed {
        let frame = json!({"event": "bookmarks.changed", "items": items_json(view)});
        write_frame(writer, &frame).await?;
    }
    Ok(())
}

/// Turns one request line into its response frame.
async fn respond(
    app: &App,
    session: &mut RpcSession,
    rate_limiter: &mut RateLimiter,
    line: &str,
) -> Value {
    let req: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return json!({"id": null, "error": format!("parse error: {}", e)}),
    };
    let id = req.get("id").cloned().unwrap_or(Value::Null);

    if !rate_limiter.check() {
        return json!({"id": id, "error": "rate limit exceeded"});
    }

    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
    let params = req.get("params").cloned().unwrap_or(json!({}));

    match handle_method(app, session, method, &params).await {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    }
}

/// Serves one session until the reader hits end of input.
///
/// Requests and change-feed events are handled one at a time, so a pushed
/// `bookmarks.changed` never interleaves with a half-written response. The
/// session's view is torn down on return.
pub async fn serve_connection<R, W>(
    app: &App,
    reader: R,
    mut writer: W,
    max_requests_per_second: u32,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut rate_limiter = RateLimiter::new(max_requests_per_second);
    let mut session = RpcSession::new();
    let mut lines = BufReader::new(reader).lines();

    write_frame(
        &mut writer,
        &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}),
    )
    .await?;

    let result = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = respond(app, &mut session, &mut rate_limiter, &line).await;
                if let Err(e) = write_frame(&mut writer, &response).await {
                    break Err(e);
                }
                if let Err(e) = flush_view(&mut writer, &mut session, false).await {
                    break Err(e);
                }
            }
            Some(event) = session.next_event() => {
                let changed = session
                    .view_mut()
                    .map(|view| {
                        matches!(
                            view.on_change_event(&event),
                            EventEffect::Inserted | EventEffect::Removed
                        )
                    })
                    .unwrap_or(false);
                if let Err(e) = flush_view(&mut writer, &mut session, changed).await {
                    break Err(e);
                }
            }
        }
    };

    session.close_view();
    debug!("connection closed");
    result
}
