//! Cache tier for the course service.
//!
//! The cache is a disposable projection of the store. This module defines
//! the narrow [`Cache`] capability the service depends on, the key scheme,
//! and two backends:
//!
//! - [`MokaCache`] - in-process cache with per-entry TTL
//! - [`RedisCache`] - shared cache over a Redis connection manager

mod error;
pub mod keys;
mod memory;
mod redis_cache;
mod traits;

pub use error::CacheError;
pub use keys::CacheKey;
pub use memory::{MokaCache, MokaCacheConfig};
pub use redis_cache::RedisCache;
pub use traits::Cache;
