//! Metrics for the course service.

pub mod cache;
pub mod http;
pub mod setup;
pub mod store;

pub use cache::CacheMetrics;
pub use setup::{detached_handle, init_metrics};
