use axum::{extract::State, response::IntoResponse, Json};

use crate::errors::ApiResult;
use crate::models::{HealthComponents, HealthResponse};
use crate::state::AppState;

/// `GET /health`. Reports the cached liveness probe the connection health
/// monitor maintains rather than issuing a fresh Redis round trip per
/// request.
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let redis_up = state.redis_up();
    let response = HealthResponse {
        status: if redis_up { "ok" } else { "degraded" },
        components: HealthComponents {
            redis: if redis_up { "up" } else { "down" },
            uptime_seconds: state.uptime_seconds(),
        },
    };
    Ok(Json(response))
}
