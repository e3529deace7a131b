//! Redis-backed TTL store

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use super::TtlStore;
use crate::error::AuthError;

/// TTL store on Redis, relying on `SET .. EX` for expiry
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Connect to Redis and keep a reconnecting connection manager
    pub async fn connect(url: &str) -> Result<Self, AuthError> {
        info!("Connecting to Redis revocation store");

        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait]
impl TtlStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let mut conn = self.redis.clone();
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        // EX takes whole seconds; round up so the record never undershoots
        let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds.max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
