use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /metrics`. A JSON snapshot of the process-wide counters, not a
/// Prometheus scrape.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "not_found",
                "message": "the requested endpoint was not found",
                "retryable": false,
                "status": 404,
            }
        })),
    )
}
