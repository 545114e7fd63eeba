//! Request validation middleware for malformed payloads and unsupported methods.
//!
//! Provides early rejection of invalid requests before they reach handlers:
//! HTTP method validation (405) and Content-Type validation (415) for
//! requests carrying a body.

use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashSet;

pub async fn request_validation_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri_path = request.uri().path().to_string();
    let headers = request.headers().clone();

    if let Err(response) = validate_http_method(&method, &uri_path) {
        return response;
    }

    if should_validate_body(&method) {
        if let Err(response) = validate_content_type(&headers) {
            return response;
        }
    }

    next.run(request).await
}

pub(crate) fn should_validate_body(method: &Method) -> bool {
    matches!(method, &Method::POST | &Method::PUT | &Method::PATCH)
}

pub(crate) fn validate_http_method(method: &Method, path: &str) -> Result<(), Response> {
    let allowed_methods = get_allowed_methods(path);

    if !allowed_methods.contains(method.as_str()) {
        tracing::warn!(
            method = %method,
            path = %path,
            allowed_methods = ?allowed_methods,
            "HTTP method not allowed for this endpoint"
        );
        return Err(method_not_allowed_response(&allowed_methods));
    }

    Ok(())
}

/// Allowed methods per route shape, matching the HTTP surface from the
/// widget service's route table.
pub(crate) fn get_allowed_methods(path: &str) -> HashSet<&'static str> {
    if path.starts_with("/health") || path.starts_with("/metrics") {
        return ["GET", "HEAD"].iter().copied().collect();
    }

    if path.ends_with("/submit") || path.ends_with("/events") {
        return ["POST"].iter().copied().collect();
    }

    if path.ends_with("/ttl") {
        return ["PUT"].iter().copied().collect();
    }

    if path.ends_with("/stats") || path.ends_with("/submissions") || path.ends_with("/export") || path.ends_with("/summary") {
        return ["GET", "HEAD"].iter().copied().collect();
    }

    if path.starts_with("/api/v1/widgets") {
        return ["GET", "POST", "PUT", "DELETE", "HEAD"].iter().copied().collect();
    }

    ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"]
        .iter()
        .copied()
        .collect()
}

fn validate_content_type(headers: &axum::http::HeaderMap) -> Result<(), Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.is_empty() && !content_type.starts_with("application/json") {
        tracing::warn!(content_type = %content_type, "unsupported Content-Type header");
        return Err(unsupported_media_type_response(content_type));
    }

    Ok(())
}

fn method_not_allowed_response(allowed_methods: &HashSet<&str>) -> Response {
    let allowed = allowed_methods.iter().copied().collect::<Vec<_>>().join(", ");

    let body = Json(json!({
        "error": {
            "type": "method_not_allowed",
            "message": format!("HTTP method not allowed. Allowed methods: {allowed}"),
            "retryable": false,
            "status": 405,
            "allowed_methods": allowed_methods.iter().copied().collect::<Vec<_>>()
        }
    }));

    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, allowed)], body).into_response()
}

fn unsupported_media_type_response(content_type: &str) -> Response {
    let body = Json(json!({
        "error": {
            "type": "unsupported_media_type",
            "message": format!("unsupported Content-Type: {content_type}, expected application/json"),
            "retryable": false,
            "status": 415,
            "received_content_type": content_type,
        }
    }));

    (StatusCode::UNSUPPORTED_MEDIA_TYPE, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_validate_body_only_for_bodies_with_payloads() {
        assert!(should_validate_body(&Method::POST));
        assert!(should_validate_body(&Method::PUT));
        assert!(!should_validate_body(&Method::GET));
        assert!(!should_validate_body(&Method::DELETE));
    }

    #[test]
    fn submit_endpoint_is_post_only() {
        let methods = get_allowed_methods("/widgets/w1/submit");
        assert!(methods.contains("POST"));
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn ttl_endpoint_is_put_only() {
        let methods = get_allowed_methods("/api/v1/users/u1/ttl");
        assert_eq!(methods, ["PUT"].into_iter().collect());
    }

    #[test]
    fn health_allows_get_and_head() {
        let methods = get_allowed_methods("/health");
        assert!(methods.contains("GET"));
        assert!(methods.contains("HEAD"));
        assert!(!methods.contains("POST"));
    }
}
