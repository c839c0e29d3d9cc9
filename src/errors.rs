use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid or missing token")]
    Unauthenticated,

    #[error("user {user} with API {api_name} already exists")]
    DuplicateCredential { user: String, api_name: String },

    #[error("no such pair: user {user} with API {api_name}")]
    NotFound { user: String, api_name: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered with a non-success status. Status and body are
    /// relayed as received.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("request forwarding failed: {0}")]
    ForwardingFailed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCredential { user, api_name } => {
                AppError::DuplicateCredential { user, api_name }
            }
            StoreError::NotFound { user, api_name } => AppError::NotFound { user, api_name },
            StoreError::InvalidInput(msg) => AppError::InvalidRequest(msg),
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Io(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_token",
                "invalid or missing token".to_string(),
            ),
            AppError::DuplicateCredential { .. } => (
                StatusCode::CONFLICT,
                "invalid_request_error",
                "duplicate_credential",
                self.to_string(),
            ),
            AppError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "not_found",
                self.to_string(),
            ),
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
                msg.clone(),
            ),
            AppError::Upstream { status, body } => {
                (*status, "upstream_error", "upstream_error", body.clone())
            }
            AppError::MalformedUpstreamResponse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "malformed_upstream_response",
                "invalid JSON response from upstream".to_string(),
            ),
            AppError::ForwardingFailed(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "forwarding_failed",
                format!("request forwarding failed: {}", e),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthenticated) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_sets_challenge_header() {
        let resp = AppError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn test_upstream_error_keeps_upstream_status() {
        let resp = AppError::Upstream {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "model loading".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_forwarding_failure_is_internal_error() {
        let resp = AppError::ForwardingFailed("connection refused".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_errors_map_one_to_one() {
        let err: AppError = StoreError::NotFound {
            user: "alice".into(),
            api_name: "ci".into(),
        }
        .into();
        assert!(matches!(err, AppError::NotFound { .. }));

        let err: AppError = StoreError::DuplicateCredential {
            user: "alice".into(),
            api_name: "ci".into(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
