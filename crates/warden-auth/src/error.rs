//! Authentication error types

use thiserror::Error;
use warden_db::DbError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username already registered")]
    UsernameTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Covers malformed, badly signed and expired tokens alike
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Current password incorrect")]
    IncorrectPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Revocation store error: {0}")]
    Revocation(String),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the error is the caller's fault rather than an internal failure
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::PasswordHash(_)
                | AuthError::Revocation(_)
                | AuthError::Database(_)
                | AuthError::Internal(_)
        )
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(_) => AuthError::UsernameTaken,
            DbError::NotFound(_) => AuthError::UserNotFound,
            other => AuthError::Database(other),
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Revocation(err.to_string())
    }
}
