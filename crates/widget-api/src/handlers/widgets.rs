//! Authenticated widget CRUD + listing/summary endpoints
//! (`/api/v1/widgets*`).

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};

use crate::errors::ApiResult;
use crate::middleware::Principal;
use crate::models::{
    CreateWidgetRequest, ListWidgetsQuery, SummaryResponse, UpdateWidgetRequest,
    WidgetPageResponse, WidgetResponse,
};
use crate::state::AppState;

pub async fn create_widget(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateWidgetRequest>,
) -> ApiResult<impl IntoResponse> {
    let widget = state
        .widget_service
        .create_widget(
            &principal.user_id,
            principal.plan,
            body.name,
            &body.widget_type,
            body.is_visible,
            body.config,
        )
        .await?;
    state.metrics.record_widget_created();
    Ok(Json(WidgetResponse::from(widget)))
}

pub async fn get_widget(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let widget = state
        .widget_service
        .get_widget_owned(&principal.user_id, &widget_id)
        .await?;
    Ok(Json(WidgetResponse::from(widget)))
}

pub async fn update_widget(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
    Json(body): Json<UpdateWidgetRequest>,
) -> ApiResult<impl IntoResponse> {
    let widget = state
        .widget_service
        .update_widget(
            &principal.user_id,
            &widget_id,
            principal.plan,
            body.name,
            body.widget_type.as_deref(),
            body.is_visible,
            body.config,
        )
        .await?;
    Ok(Json(WidgetResponse::from(widget)))
}

pub async fn delete_widget(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .widget_service
        .delete_widget(&principal.user_id, &widget_id)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn list_widgets(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListWidgetsQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .widget_service
        .list_widgets(
            &principal.user_id,
            query.widget_type.as_deref(),
            query.visible,
            query.page_size,
            query.page.as_deref(),
        )
        .await?;

    Ok(Json(WidgetPageResponse {
        items: page.items.into_iter().map(WidgetResponse::from).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn summarize_widgets(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.widget_service.summarize_widgets(&principal.user_id).await?;
    Ok(Json(SummaryResponse::from(summary)))
}
