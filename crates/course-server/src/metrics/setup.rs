//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::{cache::register_cache_metrics, http::register_http_metrics, store::register_store_metrics};

// Seconds, from 100us to 10s.
const BUCKETS: [f64; 15] = [
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Installs the global Prometheus recorder and returns the handle that
/// renders the `/metrics` endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&BUCKETS)?
        .install_recorder()?;

    register_cache_metrics();
    register_store_metrics();
    register_http_metrics();

    info!("Metrics system initialized");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
///
/// Used where several routers are built in one process, such as tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
