//! `GET /api/v1/widgets/:id/submissions` and `.../export`.

use axum::{
    extract::{Extension, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use widget_store::ExportFormat;

use crate::errors::ApiResult;
use crate::middleware::Principal;
use crate::models::{ExportQuery, ListSubmissionsQuery, SubmissionPageResponse, SubmissionResponse};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 50;

pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
    Query(query): Query<ListSubmissionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.page.unwrap_or(0).saturating_mul(page_size);

    let submissions = state
        .widget_service
        .list_submissions(&principal.user_id, &widget_id, offset, page_size)
        .await?;

    Ok(Json(SubmissionPageResponse {
        items: submissions.into_iter().map(SubmissionResponse::from).collect(),
    }))
}

pub async fn export_submissions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(widget_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let format_raw = query.format.as_deref().unwrap_or("json");
    let (bytes, format) = state
        .widget_service
        .export_submissions(&principal.user_id, &widget_id, format_raw)
        .await?;

    let content_type = match format {
        ExportFormat::Json => "application/json",
        ExportFormat::Ndjson => "application/x-ndjson",
        ExportFormat::Csv => "text/csv",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
