//! Shared cache backed by Redis.

use std::time::Duration;

use async_trait::async_trait;
use course_core::RequestContext;
use redis::aio::ConnectionManager;
use tracing::info;

use super::{Cache, CacheError};

/// Cache stored in Redis.
///
/// Holds a [`ConnectionManager`], which reconnects on failure; each call
/// works on a cheap clone of the manager so no connection is held between
/// calls.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to the Redis server at `url`, e.g. `redis://localhost:6379`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis cache");
        Ok(Self { conn })
    }

    fn check(ctx: &RequestContext) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            Err(CacheError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// TTL in whole milliseconds for `SET .. PX`, which rejects zero.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Vec<u8>, CacheError> {
        Self::check(ctx)?;
        let mut conn = self.conn.clone();

        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        value.ok_or(CacheError::Miss)
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        Self::check(ctx)?;
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(px_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        Self::check(ctx)?;
        let mut conn = self.conn.clone();

        let _removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!("unexpected PING reply '{}'", reply)))
        }
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_millis() {
        assert_eq!(px_millis(Duration::from_secs(60)), 60_000);
        assert_eq!(px_millis(Duration::from_micros(10)), 1);
        assert_eq!(px_millis(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_unavailable() {
        let result = RedisCache::connect("not a redis url").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }
}
