//! API Routes
//!
//! - `GET  /api/presign` - presigned upload URL for a CSV
//! - `POST /api/ingest`  - storage-created notification handler
//! - `GET  /api/health`  - liveness
//! - `GET  /`            - browser upload page

pub mod health;
pub mod ingest;
pub mod presign;
pub mod ui;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(presign::router())
        .merge(ingest::router())
        .merge(health::router())
        .merge(ui::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}

/// Binds the listener for `HOST`/`PORT`. `HOST` may be an IP literal or a
/// resolvable name.
pub async fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port)).await
}
