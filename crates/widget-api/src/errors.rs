//! Service-level error taxonomy. Repositories return [`widget_store::StoreError`];
//! the service maps those onto this richer taxonomy, and this module alone
//! maps the taxonomy onto HTTP status codes. No error message here reveals
//! internal key names or backtraces to a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use widget_store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    /// 404 for resource probes (never 403, to avoid disclosing existence).
    #[error("forbidden")]
    Forbidden,

    /// 403 for an authenticated action outright denied on a resource whose
    /// existence isn't secret (e.g. acting on another user's own account
    /// path) — distinct from [`ApiError::Forbidden`], which always reads as
    /// 404 so a resource probe can't distinguish "missing" from "not yours".
    #[error("action denied")]
    ActionDenied,

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backing store unavailable: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::NOT_FOUND,
            ApiError::ActionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden => "not_found",
            ApiError::ActionDenied => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::RateLimited => "rate_limited",
            ApiError::Conflict(_) => "conflict",
            ApiError::Transient(_) => "transient",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Transient(e) => ApiError::Transient(e.to_string()),
            StoreError::Fatal(msg) => ApiError::Internal(msg),
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::Serialization(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!(error = %self, "internal error"),
            StatusCode::SERVICE_UNAVAILABLE => tracing::warn!(error = %self, "transient error"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
                "status": status.as_u16(),
            }
        }));

        let mut response = (status, body).into_response();
        if matches!(self, ApiError::RateLimited) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, axum::http::HeaderValue::from_static("60"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_maps_to_not_found_status() {
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn action_denied_maps_to_forbidden_status() {
        assert_eq!(ApiError::ActionDenied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_not_found_maps_to_api_not_found() {
        let err: ApiError = StoreError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(ApiError::Transient("x".into()).is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
    }
}
