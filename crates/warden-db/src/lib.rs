//! Warden Database Layer
//!
//! This crate provides the account store for Warden, using SQLite via
//! sqlx for persistence. Username uniqueness is enforced by the schema.

pub mod error;
pub mod models;
pub mod repository;

pub use error::DbError;
pub use models::*;
pub use repository::{Database, DatabaseOptions};

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
