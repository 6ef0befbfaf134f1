use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use crate::models::{AppState, ErrorResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/presign", get(presign_upload))
}

/// GET /api/presign?filename=users.csv
///
/// Any failure becomes a 500 with `{"error": ...}`; this is the only
/// endpoint that reports errors to the caller as structured JSON.
async fn presign_upload(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match state.presign.presign(&params).await {
        Ok(response) => {
            info!(s3_key = %response.s3_key, "Issued presigned upload URL");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Error generating presign: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            )
                .into_response()
        }
    }
}
