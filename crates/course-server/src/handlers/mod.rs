//! HTTP handlers.

pub mod context;
pub mod courses;
pub mod health;
pub mod metrics;
