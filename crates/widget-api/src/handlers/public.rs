//! Unauthenticated, rate-limited widget surface: visitor submissions and
//! lifecycle events (`POST /widgets/:id/submit`, `POST /widgets/:id/events`).

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;

use widget_store::rate_limit::derive_client_ip;

use crate::errors::ApiResult;
use crate::models::{EventRequest, OkResponse, SubmissionIdResponse, SubmitRequest};
use crate::state::AppState;

pub async fn submit(
    State(state): State<AppState>,
    Path(widget_id): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SubmitRequest>,
) -> ApiResult<impl IntoResponse> {
    let client_ip = client_ip(&headers, &peer);
    let user_agent = user_agent(&headers);

    let submission = state
        .widget_service
        .submit_widget(&widget_id, body.data, client_ip, user_agent)
        .await?;
    state.metrics.record_submission_appended();

    Ok(Json(SubmissionIdResponse {
        submission_id: submission.submission_id,
    }))
}

pub async fn record_event(
    State(state): State<AppState>,
    Path(widget_id): Path<String>,
    Json(body): Json<EventRequest>,
) -> ApiResult<impl IntoResponse> {
    state.widget_service.record_event(&widget_id, &body.kind).await?;
    state.metrics.record_event();
    Ok(Json(OkResponse { ok: true }))
}

fn client_ip(headers: &HeaderMap, peer: &SocketAddr) -> Option<String> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    let peer_addr = peer.ip().to_string();
    derive_client_ip(forwarded_for, real_ip, Some(&peer_addr))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
