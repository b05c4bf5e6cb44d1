use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{repository::RepositoryError, token::TokenError};

/// ApiError
///
/// The single error type every gate and handler returns. Each variant maps to one
/// HTTP status and a human-readable `message`; the response body is always
/// `{"message": "..."}` so clients can rely on one error shape.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `Authorization` header on a protected route.
    #[error("Access Denied")]
    MissingCredentials,
    /// The header is present but the bearer token is unusable.
    #[error("Invalid Token")]
    InvalidToken(#[source] TokenError),
    /// Authenticated, but the attached role is insufficient.
    #[error("Forbidden: Admins only")]
    Forbidden,
    #[error("User not found")]
    NotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    DuplicateEmail,
    /// Anything the caller cannot act on. The detail is logged, never returned.
    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => ApiError::DuplicateEmail,
            RepositoryError::Database(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(%detail, "request failed with an internal error");
        }

        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthenticated_messages_differ_but_share_status() {
        let (status, body) = body_of(ApiError::MissingCredentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Access Denied" }));

        let (status, body) = body_of(ApiError::InvalidToken(TokenError::Expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Invalid Token" }));
    }

    #[tokio::test]
    async fn test_forbidden_body() {
        let (status, body) = body_of(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "message": "Forbidden: Admins only" }));
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_leaked() {
        let (status, body) = body_of(ApiError::Internal("connection reset".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "Internal Server Error" }));
    }

    #[test]
    fn test_repository_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(RepositoryError::DuplicateEmail),
            ApiError::DuplicateEmail
        ));
        assert!(matches!(
            ApiError::from(RepositoryError::Database("boom".into())),
            ApiError::Internal(_)
        ));
    }
}
