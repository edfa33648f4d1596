//! Cache trait definition.

use std::time::Duration;

use async_trait::async_trait;
use course_core::RequestContext;

use super::CacheError;

/// A time-bounded key-value cache holding opaque bytes.
///
/// Callers bound each call with the request's [`RequestContext`]; backends
/// may additionally stop early once the context is cancelled.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value stored at `key`.
    ///
    /// # Errors
    ///
    /// - `CacheError::Miss` if the key is absent or expired
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Stores `value` at `key`, expiring after `ttl`.
    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError>;

    /// Performs a health check on the cache.
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Returns the name of this cache, used for logging and identification.
    fn name(&self) -> &str;
}
