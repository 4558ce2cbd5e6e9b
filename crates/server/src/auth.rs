// Shared-secret authentication
// Decision: Clients present the configured secret as `Authorization: Bearer <secret>`
// Decision: Anything else is 403 with a JSON error body; /health stays open

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    secret: Arc<str>,
}

impl AuthState {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    fn accepts(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|token| constant_time_eq(token.as_bytes(), self.secret.as_bytes()))
    }
}

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn forbidden(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware for routes that require the shared secret
pub async fn require_bearer(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !auth.accepts(bearer_token(&request)) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid token");
        return Err(AuthError::forbidden("invalid token"));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_exact_secret() {
        let auth = AuthState::new("s3cret");
        assert!(auth.accepts(Some("s3cret")));
        assert!(!auth.accepts(Some("s3cre")));
        assert!(!auth.accepts(Some("s3cretX")));
        assert!(!auth.accepts(None));
        assert!(!auth.accepts(Some(" s3cret ")));
    }

    #[test]
    fn test_error_body() {
        let err = AuthError::forbidden("invalid token");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"error": "invalid token"})
        );
    }
}
