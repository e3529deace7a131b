//! Database repository implementation

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use crate::error::DbError;
use crate::models::UsernamePolicy;

// Submodules
mod users;

/// Connection pool and schema options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    /// Only honoured when the `users` table does not exist yet
    pub username_policy: UsernamePolicy,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            username_policy: UsernamePolicy::default(),
        }
    }
}

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    username_policy: UsernamePolicy,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str, options: DatabaseOptions) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect(database_url)
            .await?;

        Self::from_pool(pool, options.username_policy).await
    }

    /// Create a private in-memory database
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory(username_policy: UsernamePolicy) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool, username_policy).await
    }

    async fn from_pool(pool: SqlitePool, requested: UsernamePolicy) -> Result<Self, DbError> {
        let mut db = Self {
            pool,
            username_policy: requested,
        };
        db.run_migrations(requested).await?;

        let effective = db.detect_username_policy().await?;
        if effective != requested {
            warn!(
                "users table was created as {}, ignoring configured {}",
                effective.as_str(),
                requested.as_str()
            );
        }
        db.username_policy = effective;
        Ok(db)
    }

    /// Get the underlying pool for advanced usage
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Username policy the `users` table was created with
    pub fn username_policy(&self) -> UsernamePolicy {
        self.username_policy
    }

    /// Run database migrations
    async fn run_migrations(&self, policy: UsernamePolicy) -> Result<(), DbError> {
        info!("Running database migrations");

        // The UNIQUE constraint is what serializes concurrent registrations
        let create_users = format!(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL COLLATE {} UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            policy.collation()
        );

        sqlx::query(&create_users)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Read the collation of the existing users table back from the schema
    async fn detect_username_policy(&self) -> Result<UsernamePolicy, DbError> {
        let sql: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'users'")
                .fetch_optional(&self.pool)
                .await?;

        let sql = sql.ok_or_else(|| DbError::Migration("users table is missing".to_string()))?;
        if sql.to_ascii_uppercase().contains("COLLATE NOCASE") {
            Ok(UsernamePolicy::CaseInsensitive)
        } else {
            Ok(UsernamePolicy::CaseSensitive)
        }
    }
}
