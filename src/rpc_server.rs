//! Smartmarks RPC Server: JSON-RPC over stdin/stdout or TCP.
//!
//! With `rpc.listen` unset the process serves one session over stdio. With it
//! set, every accepted connection is its own session on one shared `App`, so
//! one tab's writes reach the other tabs' views through the change feed.
//! The protocol is described in `smartmarks::rpc_connection`.
//!
//! Logs go to stderr; stdout carries only protocol frames.

use std::io;
use std::rc::Rc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use smartmarks::app::App;
use smartmarks::rpc_connection::serve_connection;
use smartmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Accepts connections until ctrl-c. Sessions run as local tasks on this
/// thread and share `app`.
async fn serve_tcp(app: Rc<App>, addr: &str, max_per_second: u32) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "smartmarks-rpc listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let app = app.clone();
                tokio::task::spawn_local(async move {
                    info!(%peer, "client connected");
                    let (reader, writer) = stream.into_split();
                    if let Err(e) = serve_connection(&app, reader, writer, max_per_second).await {
                        warn!(%peer, error = %e, "connection failed");
                    }
                    info!(%peer, "client disconnected");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut settings = SettingsEngine::new(std::env::var("SMARTMARKS_CONFIG").ok());
    let load_result = settings.load();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.get_settings().logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match load_result {
        Ok(_) => info!(path = settings.get_config_path(), "settings loaded"),
        Err(e) => warn!(path = settings.get_config_path(), error = %e, "settings unreadable, using defaults"),
    }
    let rpc = settings.get_settings().rpc.clone();

    let app = match App::with_settings(settings) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialize");
            std::process::exit(1);
        }
    };

    let result = match rpc.listen {
        Some(addr) => {
            let local = tokio::task::LocalSet::new();
            local
                .run_until(serve_tcp(Rc::new(app), &addr, rpc.max_requests_per_second))
                .await
        }
        None => {
            info!("smartmarks-rpc ready on stdio");
            serve_connection(
                &app,
                tokio::io::stdin(),
                tokio::io::stdout(),
                rpc.max_requests_per_second,
            )
            .await
        }
    };

    match result {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            error!(error = %e, "server stopped");
            std::process::exit(1);
        }
    }
}
