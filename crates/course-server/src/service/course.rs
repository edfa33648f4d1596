//! Cache-aside course service.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use course_core::{
    CacheOperation, CacheWarning, Course, Outcome, RequestContext, Result, ServiceError,
};
use course_store::{DocumentStore, Selector, StoreError, from_document, to_document};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::cache::{Cache, CacheError, CacheKey};
use crate::metrics::CacheMetrics;
use crate::metrics::store::record_store_operation;

/// Settings of a [`CourseService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Store collection holding the courses; also the cache key prefix.
    pub collection: String,
    /// Lifetime of every cache entry.
    pub ttl: Duration,
    /// Upper bound on a single cache or store call.
    pub call_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            collection: "course".to_string(),
            ttl: Duration::from_secs(60),
            call_timeout: Duration::from_secs(1),
        }
    }
}

/// Course operations over a durable store fronted by a cache.
///
/// Reads try the cache first and fill it from the store on a miss. Writes go
/// to the store first; only after the store accepted a write does the service
/// touch the cache, and then it only removes the affected entries (a create
/// also pre-warms the new record). A failing cache never fails a call: the
/// problem is logged, counted and returned as a [`CacheWarning`].
#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn Cache>,
    config: Arc<ServiceConfig>,
    metrics: CacheMetrics,
}

impl CourseService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn Cache>, config: ServiceConfig) -> Self {
        Self {
            store,
            cache,
            config: Arc::new(config),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Returns the course named `name`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the store has no such course
    /// - `StoreFailure` if the store could not be read
    pub async fn find_one(&self, ctx: &RequestContext, name: &str) -> Result<Outcome<Course>> {
        let key = self.record_key(name);
        let mut warnings = Vec::new();

        if let Some(course) = self.read_cached::<Course>(ctx, &key, &mut warnings).await {
            return Ok(Outcome::with_warnings(course, warnings));
        }

        let selector = by_name(name);
        let lookup = self.store.find_one(ctx, &self.config.collection, &selector);
        let document = self.call_store("find_one", ctx, name, lookup).await?;
        let course: Course = from_document(document)
            .map_err(|e| ServiceError::store_failure_with_cause("stored course is malformed", e))?;

        self.write_cached(ctx, &key, &course, &mut warnings).await;
        Ok(Outcome::with_warnings(course, warnings))
    }

    /// Returns every course. An empty store yields an empty list.
    ///
    /// # Errors
    ///
    /// - `StoreFailure` if the store could not be read
    pub async fn find_all(&self, ctx: &RequestContext) -> Result<Outcome<Vec<Course>>> {
        let key = self.listing_key();
        let mut warnings = Vec::new();

        if let Some(courses) = self.read_cached::<Vec<Course>>(ctx, &key, &mut warnings).await {
            return Ok(Outcome::with_warnings(courses, warnings));
        }

        let selector = Selector::all();
        let listing = self.store.find(ctx, &self.config.collection, &selector);
        let documents = self.call_store("find", ctx, "", listing).await?;
        let courses = documents
            .into_iter()
            .map(from_document::<Course>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ServiceError::store_failure_with_cause("stored course is malformed", e))?;

        self.write_cached(ctx, &key, &courses, &mut warnings).await;
        Ok(Outcome::with_warnings(courses, warnings))
    }

    /// Stores a new course, then pre-warms its cache entry and drops the
    /// cached listing.
    ///
    /// # Errors
    ///
    /// - `StoreFailure` flagged as conflict if the name is taken
    /// - `StoreFailure` if the store rejected the write
    pub async fn create(&self, ctx: &RequestContext, course: Course) -> Result<Outcome<()>> {
        let document = to_document(&course)
            .map_err(|e| ServiceError::store_failure_with_cause("course cannot be encoded", e))?;

        let insert = self.store.insert(ctx, &self.config.collection, document);
        self.call_store("insert", ctx, &course.name, insert).await?;
        debug!(course = %course.name, "Course created");

        let mut warnings = Vec::new();
        let key = self.record_key(&course.name);
        self.write_cached(ctx, &key, &course, &mut warnings).await;
        self.invalidate(ctx, &self.listing_key(), &mut warnings).await;

        Ok(Outcome::with_warnings((), warnings))
    }

    /// Merges `course` into the stored course with the same name, then drops
    /// the cached copy and the cached listing. The cache is never written.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the store has no such course
    /// - `StoreFailure` if the store rejected the write
    pub async fn update(&self, ctx: &RequestContext, course: Course) -> Result<Outcome<()>> {
        let patch = to_document(&course)
            .map_err(|e| ServiceError::store_failure_with_cause("course cannot be encoded", e))?;

        let selector = by_name(&course.name);
        let update = self
            .store
            .update(ctx, &self.config.collection, &selector, patch);
        self.call_store("update", ctx, &course.name, update).await?;
        debug!(course = %course.name, "Course updated");

        let mut warnings = Vec::new();
        self.invalidate(ctx, &self.record_key(&course.name), &mut warnings).await;
        self.invalidate(ctx, &self.listing_key(), &mut warnings).await;

        Ok(Outcome::with_warnings((), warnings))
    }

    /// Removes the course named `name`, then drops its cached copy and the
    /// cached listing.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the store has no such course
    /// - `StoreFailure` if the store rejected the write
    pub async fn delete(&self, ctx: &RequestContext, name: &str) -> Result<Outcome<()>> {
        let selector = by_name(name);
        let remove = self.store.remove(ctx, &self.config.collection, &selector);
        self.call_store("remove", ctx, name, remove).await?;
        debug!(course = %name, "Course deleted");

        let mut warnings = Vec::new();
        self.invalidate(ctx, &self.record_key(name), &mut warnings).await;
        self.invalidate(ctx, &self.listing_key(), &mut warnings).await;

        Ok(Outcome::with_warnings((), warnings))
    }

    fn record_key(&self, name: &str) -> String {
        CacheKey::record(&self.config.collection, name).to_string()
    }

    fn listing_key(&self) -> String {
        CacheKey::listing(&self.config.collection).to_string()
    }

    /// Runs one bounded store call and maps its failure to a service error.
    async fn call_store<T>(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        name: &str,
        call: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = ctx
            .bound(self.config.call_timeout, call)
            .await
            .map_err(StoreError::from)
            .and_then(|inner| inner);

        let failure = result.as_ref().err().map(store_error_label);
        record_store_operation(operation, start.elapsed(), failure);

        result.map_err(|err| {
            let mapped = map_store_error(err, name);
            if !mapped.is_not_found() && !mapped.is_conflict() {
                error!(
                    operation,
                    course = %name,
                    request_id = ctx.request_id().unwrap_or("-"),
                    error = %mapped,
                    "Store call failed"
                );
            }
            mapped
        })
    }

    /// Looks `key` up, treating every failure as a miss. Undecodable values
    /// and backend errors additionally become warnings.
    async fn read_cached<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        key: &str,
        warnings: &mut Vec<CacheWarning>,
    ) -> Option<T> {
        let result = ctx
            .bound(self.config.call_timeout, self.cache.get(ctx, key))
            .await
            .map_err(CacheError::from)
            .and_then(|inner| inner);

        match result {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit();
                    Some(value)
                }
                Err(err) => {
                    self.metrics.record_miss();
                    let message = err.to_string();
                    self.degrade(ctx, CacheOperation::Decode, key, message, "decode", warnings);
                    None
                }
            },
            Err(CacheError::Miss) => {
                self.metrics.record_miss();
                None
            }
            Err(err) => {
                self.metrics.record_miss();
                let label = err.label();
                self.degrade(ctx, CacheOperation::Get, key, err.to_string(), label, warnings);
                None
            }
        }
    }

    /// Best-effort write of `value` under `key` with the configured TTL.
    async fn write_cached<T: Serialize>(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: &T,
        warnings: &mut Vec<CacheWarning>,
    ) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                let message = err.to_string();
                self.degrade(ctx, CacheOperation::Encode, key, message, "encode", warnings);
                return;
            }
        };

        let result = ctx
            .bound(
                self.config.call_timeout,
                self.cache.set(ctx, key, bytes, self.config.ttl),
            )
            .await
            .map_err(CacheError::from)
            .and_then(|inner| inner);

        if let Err(err) = result {
            let label = err.label();
            self.degrade(ctx, CacheOperation::Set, key, err.to_string(), label, warnings);
        }
    }

    /// Best-effort removal of `key`.
    async fn invalidate(&self, ctx: &RequestContext, key: &str, warnings: &mut Vec<CacheWarning>) {
        let result = ctx
            .bound(self.config.call_timeout, self.cache.delete(ctx, key))
            .await
            .map_err(CacheError::from)
            .and_then(|inner| inner);

        // An absent key is already invalidated.
        match result {
            Ok(()) | Err(CacheError::Miss) => {}
            Err(err) => {
                let label = err.label();
                self.degrade(ctx, CacheOperation::Delete, key, err.to_string(), label, warnings);
            }
        }
    }

    fn degrade(
        &self,
        ctx: &RequestContext,
        operation: CacheOperation,
        key: &str,
        message: String,
        reason: &'static str,
        warnings: &mut Vec<CacheWarning>,
    ) {
        warn!(
            cache = self.cache.name(),
            key = %key,
            request_id = ctx.request_id().unwrap_or("-"),
            operation = %operation,
            error = %message,
            "Cache degraded"
        );
        self.metrics.record_error(operation.as_str(), reason);
        warnings.push(CacheWarning::new(operation, key, message));
    }
}

fn by_name(name: &str) -> Selector {
    Selector::eq("name", name)
}

fn store_error_label(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound { .. } => "not_found",
        StoreError::Duplicate { .. } => "duplicate",
        StoreError::InvalidSelector(_) => "invalid_selector",
        StoreError::Codec(_) => "codec",
        StoreError::Database(_) => "database",
        StoreError::Unavailable { .. } => "unavailable",
        StoreError::Timeout(_) => "timeout",
        StoreError::Cancelled => "cancelled",
    }
}

fn map_store_error(err: StoreError, name: &str) -> ServiceError {
    match err {
        StoreError::NotFound { .. } => ServiceError::not_found(name),
        StoreError::Duplicate { .. } => ServiceError::conflict(name).with_cause(err),
        err if err.is_interrupted() => ServiceError::timeout(err.to_string()).with_cause(err),
        other => ServiceError::store_failure_with_cause("store call failed", other),
    }
}
