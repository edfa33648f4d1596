//! Error types for the course management service.
//!
//! Every failure surfaced by the service layer is a [`ServiceError`] tagged
//! with an explicit [`ErrorKind`]. Callers branch on the kind, never on the
//! concrete error that caused it:
//!
//! - [`ErrorKind::NotFound`]: the course does not exist in the persistent
//!   store. Never cached as a negative result.
//! - [`ErrorKind::StoreFailure`]: any other persistent-store error
//!   (connectivity, decoding, constraint violation, timeout). The
//!   operation is aborted.
//! - [`ErrorKind::CacheFailure`]: a cache error. The service never returns
//!   this kind as the primary error of an operation; cache problems are
//!   reported as [`CacheWarning`](crate::CacheWarning)s instead. The kind
//!   exists so callers that opt into strict handling with
//!   [`Outcome::strict`](crate::Outcome::strict) can tell it apart.
//!
//! # Example
//!
//! ```
//! use course_core::{ErrorKind, ServiceError};
//!
//! let error = ServiceError::not_found("ghost");
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! assert!(error.is_not_found());
//! ```

use std::fmt;
use thiserror::Error;

/// Discriminant of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The identifier has no durable record.
    NotFound,
    /// The persistent store failed.
    StoreFailure,
    /// The cache failed.
    CacheFailure,
}

impl ErrorKind {
    /// Returns a stable lowercase label, used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::StoreFailure => "store_failure",
            Self::CacheFailure => "cache_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by service operations.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    conflict: bool,
    timeout: bool,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ServiceError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            conflict: false,
            timeout: false,
            cause: None,
        }
    }

    /// Creates a NotFound error for the given course name.
    pub fn not_found(name: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("course '{}' not found", name.as_ref()),
        )
    }

    /// Creates a StoreFailure error without a cause.
    pub fn store_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreFailure, message)
    }

    /// Creates a StoreFailure error with a cause.
    pub fn store_failure_with_cause<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(ErrorKind::StoreFailure, message)
        }
    }

    /// Creates a StoreFailure error raised by a unique-key violation.
    pub fn conflict(name: impl AsRef<str>) -> Self {
        Self {
            conflict: true,
            ..Self::new(
                ErrorKind::StoreFailure,
                format!("course '{}' already exists", name.as_ref()),
            )
        }
    }

    /// Creates a StoreFailure error raised by an expired deadline or a
    /// cancelled request.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timeout: true,
            ..Self::new(ErrorKind::StoreFailure, message)
        }
    }

    /// Creates a CacheFailure error.
    pub fn cache_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CacheFailure, message)
    }

    /// Attaches an underlying cause.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the course does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true if the error came from the persistent store.
    pub fn is_store_failure(&self) -> bool {
        self.kind == ErrorKind::StoreFailure
    }

    /// Returns true if the store rejected a duplicate natural key.
    pub fn is_conflict(&self) -> bool {
        self.conflict
    }

    /// Returns true if the call ran out of time or was cancelled.
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

/// Type alias for Results with ServiceError.
pub type Result<T> = std::result::Result<T, ServiceError>;
