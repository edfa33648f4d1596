//! Construction of the service's collaborators from settings.

use std::sync::Arc;

use anyhow::Context;
use course_store::{DocumentStore, MemoryStore, SqliteStore};
use tracing::info;

use crate::cache::{Cache, MokaCache, MokaCacheConfig, RedisCache};
use crate::config::{CacheBackend, Settings, StoreBackend};
use crate::service::CourseService;

/// Unique natural key of a course.
const NAME_FIELD: &str = "name";

/// The store the service runs on, kept concrete so it can be closed at
/// shutdown.
pub enum StoreHandle {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl StoreHandle {
    pub fn as_dyn(&self) -> Arc<dyn DocumentStore> {
        match self {
            Self::Memory(store) => store.clone() as Arc<dyn DocumentStore>,
            Self::Sqlite(store) => store.clone() as Arc<dyn DocumentStore>,
        }
    }

    /// Releases the store's connections.
    pub async fn close(&self) {
        if let Self::Sqlite(store) = self {
            store.close().await;
        }
    }
}

/// Opens the configured store and ensures the unique index on the course
/// name.
pub async fn build_store(settings: &Settings) -> anyhow::Result<StoreHandle> {
    let handle = match settings.store.backend {
        StoreBackend::Memory => StoreHandle::Memory(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&settings.store.url, settings.store.max_connections)
                .await
                .with_context(|| format!("failed to open store at {}", settings.store.url))?;
            StoreHandle::Sqlite(Arc::new(store))
        }
    };

    handle
        .as_dyn()
        .ensure_index(&settings.service.collection, NAME_FIELD, true)
        .await
        .context("failed to ensure unique index on course name")?;

    info!(backend = ?settings.store.backend, "Store ready");
    Ok(handle)
}

/// Opens the configured cache.
pub async fn build_cache(settings: &Settings) -> anyhow::Result<Arc<dyn Cache>> {
    let cache: Arc<dyn Cache> = match settings.cache.backend {
        CacheBackend::Memory => Arc::new(MokaCache::new(MokaCacheConfig {
            max_capacity: settings.cache.max_capacity,
        })),
        CacheBackend::Redis => {
            let url = settings
                .cache
                .redis_url
                .as_deref()
                .context("cache.redis_url is required for the redis backend")?;
            Arc::new(
                RedisCache::connect(url)
                    .await
                    .context("failed to connect to redis")?,
            )
        }
    };

    info!(backend = cache.name(), ttl = ?settings.cache.ttl, "Cache ready");
    Ok(cache)
}

/// Builds the course service from settings. Returns the store handle too so
/// the caller can close it.
pub async fn build_service(settings: &Settings) -> anyhow::Result<(CourseService, StoreHandle)> {
    let store = build_store(settings).await?;
    let cache = build_cache(settings).await?;
    let service = CourseService::new(store.as_dyn(), cache, settings.service_config());
    Ok((service, store))
}
