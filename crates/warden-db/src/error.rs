//! Account store errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Account store unavailable: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("No account with {0}")]
    NotFound(String),

    #[error("An account already uses {0}")]
    Duplicate(String),

    #[error("Account schema setup failed: {0}")]
    Migration(String),
}
