//! Warden Authentication
//!
//! This crate provides password hashing, JWT issuance and validation,
//! token revocation, and the `AuthService` that ties them to the
//! account store.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod revocation;
pub mod service;

pub use error::AuthError;
pub use jwt::{Claims, JwtManager};
pub use middleware::{AuthUser, bearer_token};
pub use password::{CredentialHasher, HashingParams};
pub use revocation::{MemoryStore, RedisStore, RevocationStore, SessionCutoff, TtlStore};
pub use service::{AuthService, PasswordChangePolicy, RegisteredUser};
