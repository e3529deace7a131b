//! Token revocation (logout blacklist)
//!
//! Revocations are negative-cache entries in a key-value store with native
//! expiry. A record lives exactly as long as the token it blocks, so the
//! store cleans itself and nothing here ever sweeps.

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::jwt::Claims;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

const TOKEN_KEY_PREFIX: &str = "blacklist:jwt:";
const USER_KEY_PREFIX: &str = "blacklist:user:";
const REVOKED_MARKER: &str = "true";

/// Key-value store with per-key expiry
///
/// This is the whole contract the revocation logic needs; any store with
/// native TTL support can back it.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Check whether a live record exists
    async fn exists(&self, key: &str) -> Result<bool, AuthError>;

    /// Read a live record
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Write a record that the store discards after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: StdDuration) -> Result<(), AuthError>;
}

/// Password-change cutoff for one user's sessions
///
/// Tokens of the user issued before `cutoff` (Unix milliseconds) are
/// revoked, except the token whose ID is `keep`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCutoff {
    pub cutoff: i64,
    pub keep: String,
}

impl SessionCutoff {
    /// Whether this cutoff blocks the given token
    pub fn revokes(&self, claims: &Claims) -> bool {
        claims.iat_ms < self.cutoff && claims.jti != self.keep
    }
}

/// Revocation records on top of a TTL store
#[derive(Clone)]
pub struct RevocationStore {
    store: Arc<dyn TtlStore>,
}

impl RevocationStore {
    pub fn new(store: Arc<dyn TtlStore>) -> Self {
        Self { store }
    }

    /// Revocation store backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Check whether a token has been explicitly revoked
    pub async fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        self.store.exists(&token_key(token)).await
    }

    /// Revoke a token for the rest of its lifetime
    ///
    /// `remaining` is the token's expiry minus now. Nothing is written when
    /// the token is already dead.
    pub async fn revoke(&self, token: &str, remaining: Duration) -> Result<(), AuthError> {
        let Some(ttl) = positive_ttl(remaining) else {
            debug!("Token already expired, skipping revocation record");
            return Ok(());
        };

        self.store
            .set_ex(&token_key(token), REVOKED_MARKER, ttl)
            .await?;

        info!("Token revoked, record expires in {} seconds", ttl.as_secs());
        Ok(())
    }

    /// Record a session cutoff for a user
    pub async fn revoke_user_sessions(
        &self,
        user_id: i64,
        cutoff: &SessionCutoff,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let Some(ttl) = positive_ttl(ttl) else {
            return Ok(());
        };

        let value = serde_json::to_string(cutoff)
            .map_err(|e| AuthError::Internal(format!("Failed to encode session cutoff: {}", e)))?;
        self.store.set_ex(&user_key(user_id), &value, ttl).await?;

        info!("Sessions of user {} issued before {} revoked", user_id, cutoff.cutoff);
        Ok(())
    }

    /// Current session cutoff for a user, if any
    pub async fn session_cutoff(&self, user_id: i64) -> Result<Option<SessionCutoff>, AuthError> {
        let Some(raw) = self.store.get(&user_key(user_id)).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AuthError::Revocation(format!("Corrupt session cutoff: {}", e)))
    }
}

fn positive_ttl(remaining: Duration) -> Option<StdDuration> {
    remaining.to_std().ok().filter(|ttl| !ttl.is_zero())
}

/// Store key for a token: hex SHA-256 of the full token string
fn token_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{}{}", TOKEN_KEY_PREFIX, hex::encode(hasher.finalize()))
}

fn user_key(user_id: i64) -> String {
    format!("{}{}", USER_KEY_PREFIX, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat_ms: i64, jti: &str) -> Claims {
        Claims {
            sub: "1".to_string(),
            username: "alice".to_string(),
            exp: iat_ms / 1000 + 3600,
            iat: iat_ms / 1000,
            iat_ms,
            jti: jti.to_string(),
        }
    }

    #[test]
    fn test_token_key_is_digest() {
        let key = token_key("header.payload.signature");
        assert!(key.starts_with("blacklist:jwt:"));
        assert_eq!(key.len(), "blacklist:jwt:".len() + 64);
        assert!(!key.contains("payload"));
        assert_eq!(key, token_key("header.payload.signature"));
        assert_ne!(key, token_key("header.payload.signaturf"));
    }

    #[tokio::test]
    async fn test_revoke_and_check() {
        let store = RevocationStore::in_memory();

        assert!(!store.is_revoked("token-a").await.unwrap());
        store.revoke("token-a", Duration::hours(1)).await.unwrap();
        assert!(store.is_revoked("token-a").await.unwrap());
        assert!(!store.is_revoked("token-b").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_expired_token_is_noop() {
        let backend = Arc::new(MemoryStore::new());
        let store = RevocationStore::new(backend.clone());

        store.revoke("token-a", Duration::zero()).await.unwrap();
        store.revoke("token-b", Duration::seconds(-30)).await.unwrap();

        assert!(!store.is_revoked("token-a").await.unwrap());
        assert!(!store.is_revoked("token-b").await.unwrap());
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_record_expires_with_token() {
        let store = RevocationStore::in_memory();

        store
            .revoke("token-a", Duration::milliseconds(50))
            .await
            .unwrap();
        assert!(store.is_revoked("token-a").await.unwrap());

        tokio::time::sleep(StdDuration::from_millis(120)).await;
        assert!(!store.is_revoked("token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_session_cutoff_round_trip() {
        let store = RevocationStore::in_memory();
        assert!(store.session_cutoff(1).await.unwrap().is_none());

        let cutoff = SessionCutoff {
            cutoff: 1_000,
            keep: "kept".to_string(),
        };
        store
            .revoke_user_sessions(1, &cutoff, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.session_cutoff(1).await.unwrap(), Some(cutoff));
        assert!(store.session_cutoff(2).await.unwrap().is_none());
    }

    #[test]
    fn test_session_cutoff_revokes() {
        let cutoff = SessionCutoff {
            cutoff: 1_700_000_000_500,
            keep: "kept".to_string(),
        };

        assert!(cutoff.revokes(&claims(1_700_000_000_499, "other")));
        assert!(!cutoff.revokes(&claims(1_700_000_000_499, "kept")));
        assert!(!cutoff.revokes(&claims(1_700_000_000_500, "other")));
        assert!(!cutoff.revokes(&claims(1_700_000_000_501, "other")));
    }

    #[test]
    fn test_session_cutoff_splits_a_second() {
        let cutoff = SessionCutoff {
            cutoff: 1_700_000_000_500,
            keep: "kept".to_string(),
        };

        // Same whole second on both sides of the cutoff
        let before = claims(1_700_000_000_100, "early");
        let after = claims(1_700_000_000_900, "late");
        assert_eq!(before.iat, after.iat);
        assert!(cutoff.revokes(&before));
        assert!(!cutoff.revokes(&after));
    }
}
