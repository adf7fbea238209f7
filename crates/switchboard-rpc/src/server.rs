//! HTTP server implementation using Axum.

use crate::handler::{handle_call, handle_exec, handle_index, handle_list, handle_ws};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard_core::Registry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    /// Connection registry: every worker currently attached over a socket.
    pub registry: Arc<Registry>,
}

/// Start the bridge server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    registry: Arc<Registry>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { registry });

    // Workers and dashboards connect from anywhere; the original bridge
    // accepted any origin on upgrade.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .route("/", get(handle_index))
        .route("/ws", get(handle_ws))
        .route("/call", get(handle_call))
        .route("/exec", get(handle_exec))
        .route("/list", get(handle_list))
        .layer(cors)
        .with_state(state);

    info!("mounted routes: / /ws /call /exec /list");

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    Ok(actual_addr)
}
