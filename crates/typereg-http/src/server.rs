//! HTTP server implementation using Axum.

use crate::handler::{handle_delete, handle_get, handle_health, handle_set, handle_types};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use typereg::TypeRegistry;

/// Server configuration.
pub struct ServerConfig;

impl ServerConfig {
    /// Deadline applied to the registry calls of one request.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Requests served at the same time before new ones wait.
    pub const MAX_CONCURRENT_REQUESTS: usize = 256;
}

/// Application state shared across handlers.
pub struct AppState {
    pub registry: Arc<TypeRegistry>,
}

/// Build the router over `registry`.
pub fn router(registry: Arc<TypeRegistry>) -> Router {
    let state = Arc::new(AppState { registry });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/typereg/types", get(handle_types))
        .route("/typereg/instances/getter", post(handle_get))
        .route("/typereg/instances/setter", post(handle_set))
        .route("/typereg/instances/deletion", post(handle_delete))
        .layer(ConcurrencyLimitLayer::new(ServerConfig::MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(registry: Arc<TypeRegistry>, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(registry);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("Server error: {}", err);
        }
    });

    Ok(actual_addr)
}
