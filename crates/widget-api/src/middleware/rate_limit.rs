//! Applies the per-IP + global fixed-window admission check to the public,
//! unauthenticated widget endpoints before they reach a handler.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use widget_store::rate_limit::derive_client_ip;

use crate::state::AppState;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response<Body> {
    let forwarded_for = header_str(&request, "x-forwarded-for");
    let real_ip = header_str(&request, "x-real-ip");
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    let client_ip = match derive_client_ip(
        forwarded_for.as_deref(),
        real_ip.as_deref(),
        peer_addr.as_deref(),
    ) {
        Some(ip) => ip,
        None => return internal_error_response("could not derive a client IP for rate limiting"),
    };

    match state.rate_limiter.admit(&client_ip).await {
        Ok(decision) => {
            state.metrics.record_admission(decision.admitted);
            if decision.admitted {
                next.run(request).await
            } else {
                rate_limited_response()
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "rate limiter backing store failed, failing closed");
            internal_error_response("rate limiter unavailable")
        }
    }
}

fn header_str(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn rate_limited_response() -> Response<Body> {
    let body = Json(json!({
        "error": {
            "type": "rate_limited",
            "message": "too many requests",
            "retryable": true,
            "status": 429,
        }
    }));
    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
    response
}

fn internal_error_response(message: &str) -> Response<Body> {
    let body = Json(json!({
        "error": {
            "type": "transient",
            "message": message,
            "retryable": true,
            "status": 503,
        }
    }));
    (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
}
