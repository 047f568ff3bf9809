//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::AgentError;
use crate::server::handlers::{deploy_handler, health_handler, version_handler};
use crate::server::state::ServerState;

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Webhook, on every other path
        .fallback(deploy_handler)
        // State and middleware
        .with_state(state)
        // Push payloads can exceed axum's default 2 MB limit
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
///
/// Binding happens before this returns, so a bad listen address is reported
/// to the caller instead of the spawned task.
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), AgentError>>, AgentError> {
    let app = router(state);

    let listener = TcpListener::bind(&options.listen_address)
        .await
        .map_err(|e| {
            AgentError::ServerError(format!("failed to bind {}: {}", options.listen_address, e))
        })?;

    let local_addr = listener.local_addr()?;
    info!("Listening on {}", local_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AgentError::ServerError(e.to_string()))
    });

    Ok(handle)
}
