//! Course Core - Domain types and traits
//!
//! This crate provides the foundational types for the course management
//! service: the [`Course`] record, the error taxonomy shared by every layer,
//! the [`Outcome`] wrapper that carries cache warnings next to a successful
//! value, and the [`RequestContext`] that bounds every outbound call.

pub mod context;
pub mod error;
pub mod outcome;
pub mod types;

pub use context::{Interrupted, RequestContext};
pub use error::{ErrorKind, Result, ServiceError};
pub use outcome::{CacheOperation, CacheWarning, Outcome};
pub use types::Course;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
