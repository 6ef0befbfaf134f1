use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};

use crate::models::{AppState, ErrorResponse, StorageEvent};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/ingest", post(ingest_event))
}

/// POST /api/ingest with an S3 "ObjectCreated" notification body.
///
/// Errors are already logged by the ingest service. A failure answers 500 so
/// the notifying platform sees it, without any partial-progress detail.
async fn ingest_event(State(state): State<AppState>, Json(event): Json<StorageEvent>) -> impl IntoResponse {
    match state.ingest.handle_event(&event).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response(),
    }
}
