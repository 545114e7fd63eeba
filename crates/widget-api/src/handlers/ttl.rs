//! `PUT /api/v1/users/:id/ttl`: synchronous plan-change retention sweep.

use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::errors::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::models::UpdatePlanRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateOwnerPlanResponse {
    pub widgets_updated: u64,
}

/// Only the owner named in the path may trigger their own retention sweep;
/// no caller may run it against an arbitrary `user_id`.
pub async fn update_owner_plan(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdatePlanRequest>,
) -> ApiResult<impl IntoResponse> {
    if principal.user_id != user_id {
        return Err(ApiError::ActionDenied);
    }

    let widgets_updated = state.widget_service.update_owner_plan(&user_id, &body.plan).await?;
    Ok(Json(UpdateOwnerPlanResponse { widgets_updated }))
}
