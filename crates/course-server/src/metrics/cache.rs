//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Describes the cache metrics. Call once at startup.
pub fn register_cache_metrics() {
    metrics::describe_counter!("course_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("course_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "course_cache_errors_total",
        "Cache calls that failed and were downgraded to warnings"
    );
    metrics::describe_counter!(
        "course_cache_evictions_total",
        "Total number of in-process cache evictions"
    );
    metrics::describe_gauge!("course_cache_entries", "Current number of entries in cache");
    metrics::describe_histogram!(
        "course_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Cache metrics recorder.
///
/// Mirrors hits, misses and errors in local counters so a service instance
/// can report its own hit rate.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("course_cache_hits_total").increment(1);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("course_cache_misses_total").increment(1);
    }

    /// Records a failed cache call. `reason` is a [`CacheError`] label.
    ///
    /// [`CacheError`]: crate::cache::CacheError
    pub fn record_error(&self, operation: &'static str, reason: &'static str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!(
            "course_cache_errors_total",
            "operation" => operation,
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_eviction(&self, reason: &'static str) {
        counter!("course_cache_evictions_total", "reason" => reason).increment(1);
    }

    pub fn update_entry_count(&self, count: u64) {
        gauge!("course_cache_entries").set(count as f64);
    }

    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("course_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}
