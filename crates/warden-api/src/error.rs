//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use warden_auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, blank, oversized or unparseable request fields
    #[error("Validation error")]
    Validation,

    #[error("No token provided")]
    MissingToken,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Status code and the fixed message shown to clients
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation => (StatusCode::BAD_REQUEST, "validation error"),
            ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "no token provided"),
            ApiError::RouteNotFound => (StatusCode::NOT_FOUND, "route not found"),
            ApiError::Auth(e) => match e {
                AuthError::UsernameTaken => (StatusCode::BAD_REQUEST, "username already registered"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid credentials"),
                AuthError::InvalidToken | AuthError::UserNotFound => {
                    (StatusCode::UNAUTHORIZED, "invalid token")
                }
                AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "token revoked"),
                AuthError::IncorrectPassword => {
                    (StatusCode::UNAUTHORIZED, "current password incorrect")
                }
                AuthError::PasswordHash(_)
                | AuthError::Revocation(_)
                | AuthError::Database(_)
                | AuthError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Internal detail stays in the logs
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_db::DbError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Validation, StatusCode::BAD_REQUEST, "validation error"),
            (ApiError::MissingToken, StatusCode::UNAUTHORIZED, "no token provided"),
            (ApiError::RouteNotFound, StatusCode::NOT_FOUND, "route not found"),
            (
                AuthError::UsernameTaken.into(),
                StatusCode::BAD_REQUEST,
                "username already registered",
            ),
            (
                AuthError::IncorrectPassword.into(),
                StatusCode::UNAUTHORIZED,
                "current password incorrect",
            ),
            (AuthError::UserNotFound.into(), StatusCode::UNAUTHORIZED, "invalid token"),
            (AuthError::TokenRevoked.into(), StatusCode::UNAUTHORIZED, "token revoked"),
        ];

        for (error, status, message) in cases {
            assert_eq!(error.status_and_message(), (status, message));
        }
    }

    #[test]
    fn test_internal_detail_hidden() {
        let error: ApiError = AuthError::Database(DbError::Migration("disk on fire".into())).into();
        let (status, message) = error.status_and_message();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("disk"));
    }
}
