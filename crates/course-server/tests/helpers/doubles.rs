//! Recording test doubles for the cache and the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use course_core::{Course, RequestContext};
use course_server::cache::{Cache, CacheError};
use course_server::{CourseService, ServiceConfig};
use course_store::{Document, DocumentStore, MemoryStore, Selector, StoreError, to_document};
use parking_lot::Mutex;

/// A call received by [`RecordingCache`].
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCall {
    Get(String),
    Set { key: String, ttl: Duration },
    Delete(String),
}

/// In-memory cache that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<CacheCall>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes without recording a call.
    pub fn seed(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.lock().insert(key.to_string(), value.into());
    }

    /// Stores a JSON value without recording a call.
    pub fn seed_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        self.seed(key, serde_json::to_vec(value).unwrap());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .lock()
            .get(key)
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn sets(&self) -> Vec<(String, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CacheCall::Set { key, ttl } => Some((key, ttl)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CacheCall::Delete(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_everything(&self) {
        self.fail_gets(true);
        self.fail_sets(true);
        self.fail_deletes(true);
    }

    /// Makes every call sleep for `delay` before answering.
    pub fn delay_calls(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn unavailable() -> CacheError {
    CacheError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl Cache for RecordingCache {
    async fn get(&self, _ctx: &RequestContext, key: &str) -> Result<Vec<u8>, CacheError> {
        self.calls.lock().push(CacheCall::Get(key.to_string()));
        self.pause().await;
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.lock().get(key).cloned().ok_or(CacheError::Miss)
    }

    async fn set(
        &self,
        _ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.calls.lock().push(CacheCall::Set {
            key: key.to_string(),
            ttl,
        });
        self.pause().await;
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        self.calls.lock().push(CacheCall::Delete(key.to_string()));
        self.pause().await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        if self.fail_get.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Store wrapping a [`MemoryStore`] that records operation names and can
/// be told to fail or stall.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<&'static str>>,
    fail: AtomicBool,
    panic: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `course` directly, without recording a call.
    pub async fn seed(&self, collection: &str, course: &Course) {
        self.inner
            .insert(
                &RequestContext::background(),
                collection,
                to_document(course).unwrap(),
            )
            .await
            .unwrap();
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn count_of(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delay_calls(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Makes every later call panic.
    pub fn panic_on_calls(&self) {
        self.panic.store(true, Ordering::SeqCst);
    }

    async fn enter(&self, operation: &'static str) -> Result<(), StoreError> {
        self.calls.lock().push(operation);
        if self.panic.load(Ordering::SeqCst) {
            panic!("store call '{operation}' panicked");
        }
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn find_one(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Document, StoreError> {
        self.enter("find_one").await?;
        self.inner.find_one(ctx, collection, selector).await
    }

    async fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, StoreError> {
        self.enter("find").await?;
        self.inner.find(ctx, collection, selector).await
    }

    async fn insert(
        &self,
        ctx: &RequestContext,
        collection: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.enter("insert").await?;
        self.inner.insert(ctx, collection, document).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
        update: Document,
    ) -> Result<(), StoreError> {
        self.enter("update").await?;
        self.inner.update(ctx, collection, selector, update).await
    }

    async fn remove(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<(), StoreError> {
        self.enter("remove").await?;
        self.inner.remove(ctx, collection, selector).await
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<u64, StoreError> {
        self.enter("count").await?;
        self.inner.count(ctx, collection, selector).await
    }

    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError> {
        self.inner.ensure_index(collection, field, unique).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("injected failure"))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// A service wired to recording doubles.
pub struct ServiceFixture {
    pub service: CourseService,
    pub store: Arc<RecordingStore>,
    pub cache: Arc<RecordingCache>,
}

impl ServiceFixture {
    pub fn config(&self) -> &ServiceConfig {
        self.service.config()
    }
}

/// Builds a service over fresh doubles with a unique index on the name.
pub async fn fixture() -> ServiceFixture {
    fixture_with(ServiceConfig::default()).await
}

pub async fn fixture_with(config: ServiceConfig) -> ServiceFixture {
    let store = Arc::new(RecordingStore::new());
    let cache = Arc::new(RecordingCache::new());
    store
        .ensure_index(&config.collection, "name", true)
        .await
        .unwrap();

    let service = CourseService::new(store.clone(), cache.clone(), config);
    ServiceFixture {
        service,
        store,
        cache,
    }
}
