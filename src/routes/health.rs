use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::db;
use crate::models::{AppState, HealthResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match &state.db {
        None => ("ok", "not configured"),
        Some(pool) => match db::health_check(pool).await {
            Ok(()) => ("ok", "connected"),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                ("degraded", "unreachable")
            }
        },
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: database.to_string(),
    })
}
