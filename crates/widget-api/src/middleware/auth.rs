//! Bearer-token authentication for the `/api/v1/*` surface.
//!
//! Tokens are HS256-signed JWTs carrying a `user_id` (subject) and `plan`
//! claim. Public endpoints (widget submission, lifecycle events, health,
//! metrics) are exempt and never reach this middleware's checks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use widget_types::Plan;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub plan: Plan,
    pub exp: usize,
}

/// The authenticated caller, attached to request extensions after a
/// successful token verification.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub plan: Plan,
}

#[derive(Clone)]
pub struct AuthConfig {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    public_paths: Arc<Vec<&'static str>>,
}

impl AuthConfig {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(jwt_secret.as_bytes())),
            validation: Arc::new(Validation::new(jsonwebtoken::Algorithm::HS256)),
            public_paths: Arc::new(vec!["/health", "/metrics"]),
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
            || (path.starts_with("/widgets/") && (path.ends_with("/submit") || path.ends_with("/events")))
    }

    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response<Body> {
    let path = request.uri().path().to_string();

    if state.auth.is_public_path(&path) {
        return next.run(request).await;
    }

    let token = match extract_bearer_token(&request) {
        Some(token) => token,
        None => return unauthorized_response("missing bearer token"),
    };

    match state.auth.verify(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(Principal {
                user_id: claims.sub,
                plan: claims.plan,
            });
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "bearer token rejected");
            unauthorized_response("invalid or expired token")
        }
    }
}

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

fn unauthorized_response(message: &str) -> Response<Body> {
    let body = Json(json!({
        "error": {
            "type": "unauthorized",
            "message": message,
            "retryable": false,
            "status": 401,
        }
    }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn extracts_bearer_token_from_header() {
        let request = HttpRequest::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let request = HttpRequest::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&request), None);
    }

    #[test]
    fn public_paths_include_submit_and_events_but_not_widget_crud() {
        let auth = AuthConfig::new("secret");
        assert!(auth.is_public_path("/widgets/w1/submit"));
        assert!(auth.is_public_path("/widgets/w1/events"));
        assert!(auth.is_public_path("/health"));
        assert!(!auth.is_public_path("/api/v1/widgets"));
    }
}
