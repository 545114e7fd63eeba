//! `GET /api/v1/widgets/:id/stats`.

use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Json,
};

use crate::errors::ApiResult;
use crate::middleware::Principal;
use crate::models::StatsResponse;
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.widget_service.get_stats(&principal.user_id, &widget_id).await?;
    Ok(Json(StatsResponse::from(summary)))
}
