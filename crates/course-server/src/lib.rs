//! # Course Server
//!
//! HTTP service managing courses. Records live in a document store; reads
//! are served through a cache-aside policy backed by an in-process or Redis
//! cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod service;
pub mod startup;
pub mod state;
pub mod telemetry;

pub use config::Settings;
pub use server::{create_router, create_router_with_limit, run_server};
pub use service::{CourseService, ServiceConfig};
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
