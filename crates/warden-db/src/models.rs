//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidUsernamePolicy(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidUsernamePolicy(s) => write!(f, "Invalid username policy: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// How usernames are compared for uniqueness and lookup.
///
/// The policy is baked into the `users` table when it is first created;
/// opening an existing database with a different policy has no effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UsernamePolicy {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl UsernamePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsernamePolicy::CaseSensitive => "case-sensitive",
            UsernamePolicy::CaseInsensitive => "case-insensitive",
        }
    }

    /// SQLite collation used for the username column
    pub fn collation(&self) -> &'static str {
        match self {
            UsernamePolicy::CaseSensitive => "BINARY",
            UsernamePolicy::CaseInsensitive => "NOCASE",
        }
    }
}

impl FromStr for UsernamePolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "case-sensitive" => Ok(UsernamePolicy::CaseSensitive),
            "case-insensitive" => Ok(UsernamePolicy::CaseInsensitive),
            _ => Err(ParseError::InvalidUsernamePolicy(s.to_string())),
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
