//! In-process cache using Moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use course_core::RequestContext;
use moka::Expiry;
use moka::future::Cache as MokaInner;
use moka::notification::RemovalCause;

use super::{Cache, CacheError};
use crate::metrics::CacheMetrics;

/// Configuration of the in-process cache.
#[derive(Debug, Clone)]
pub struct MokaCacheConfig {
    /// Maximum number of entries (default: 10000).
    pub max_capacity: u64,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Cache held in process memory, thread-safe and async-friendly.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use course_core::RequestContext;
/// use course_server::cache::{Cache, MokaCache, MokaCacheConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = MokaCache::new(MokaCacheConfig::default());
/// let ctx = RequestContext::background();
///
/// cache.set(&ctx, "course:one:algebra", b"{}".to_vec(), Duration::from_secs(60)).await.unwrap();
/// assert!(cache.get(&ctx, "course:one:algebra").await.is_ok());
/// # }
/// ```
#[derive(Clone)]
pub struct MokaCache {
    inner: MokaInner<String, Entry>,
    metrics: CacheMetrics,
}

impl MokaCache {
    pub fn new(config: MokaCacheConfig) -> Self {
        let metrics = CacheMetrics::new();

        let eviction_metrics = metrics.clone();
        let inner = MokaInner::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                let reason = match cause {
                    RemovalCause::Expired => "ttl",
                    RemovalCause::Size => "capacity",
                    RemovalCause::Explicit => "manual",
                    RemovalCause::Replaced => "replaced",
                };
                eviction_metrics.record_eviction(reason);
            })
            .build();

        Self { inner, metrics }
    }

    /// Approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Runs pending maintenance such as evicting expired entries.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    fn check(ctx: &RequestContext) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            Err(CacheError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Cache for MokaCache {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Vec<u8>, CacheError> {
        Self::check(ctx)?;
        let start = Instant::now();
        let entry = self.inner.get(key).await;
        self.metrics.record_operation_duration("get", start.elapsed());

        entry.map(|e| e.value.to_vec()).ok_or(CacheError::Miss)
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        Self::check(ctx)?;
        let start = Instant::now();
        let entry = Entry {
            value: value.into(),
            ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
        self.metrics.record_operation_duration("set", start.elapsed());
        self.metrics.update_entry_count(self.inner.entry_count());
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        Self::check(ctx)?;
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "moka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MokaCache {
        MokaCache::new(MokaCacheConfig::default())
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    #[tokio::test]
    async fn test_get_absent_key_is_miss() {
        let result = cache().get(&ctx(), "course:one:ghost").await;
        assert!(result.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = cache();
        cache
            .set(&ctx(), "k", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get(&ctx(), "k").await.unwrap(), b"value");
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        cache.set(&ctx(), "k", b"one".to_vec(), ttl).await.unwrap();
        cache.set(&ctx(), "k", b"two".to_vec(), ttl).await.unwrap();

        assert_eq!(cache.get(&ctx(), "k").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = cache();
        cache
            .set(&ctx(), "k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        cache.delete(&ctx(), "k").await.unwrap();
        cache.delete(&ctx(), "k").await.unwrap();
        cache.delete(&ctx(), "never-set").await.unwrap();

        assert!(cache.get(&ctx(), "k").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = cache();
        cache
            .set(&ctx(), "short", b"v".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .set(&ctx(), "long", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.run_pending_tasks().await;

        assert!(cache.get(&ctx(), "short").await.unwrap_err().is_miss());
        assert!(cache.get(&ctx(), "long").await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let ctx = ctx();
        ctx.cancel();

        let result = cache().get(&ctx, "k").await;
        assert!(matches!(result, Err(CacheError::Cancelled)));
    }
}
