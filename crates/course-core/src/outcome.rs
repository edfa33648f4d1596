//! Successful results annotated with cache warnings.

use std::fmt;

use crate::error::ServiceError;

/// Cache operation that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    Decode,
    Encode,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Decode => "decode",
            Self::Encode => "encode",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cache problem that did not prevent the operation from succeeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWarning {
    /// The cache operation that failed.
    pub operation: CacheOperation,
    /// The cache key involved.
    pub key: String,
    /// Description of the failure.
    pub message: String,
}

impl CacheWarning {
    pub fn new(
        operation: CacheOperation,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CacheWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache {} on '{}' failed: {}", self.operation, self.key, self.message)
    }
}

/// The value of a successful operation plus any cache warnings raised
/// while producing it.
///
/// Warnings never change whether an operation succeeded. Callers that want
/// to treat a degraded cache as an error can opt in with [`Outcome::strict`].
///
/// # Example
///
/// ```
/// use course_core::{CacheOperation, CacheWarning, Outcome};
///
/// let mut outcome = Outcome::new(42);
/// outcome.warn(CacheWarning::new(CacheOperation::Set, "course:one:a", "timeout"));
///
/// assert!(outcome.is_degraded());
/// assert_eq!(outcome.into_value(), 42);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Outcome<T> {
    value: T,
    warnings: Vec<CacheWarning>,
}

impl<T> Outcome<T> {
    /// Wraps a value with no warnings.
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Wraps a value together with warnings gathered while producing it.
    pub fn with_warnings(value: T, warnings: Vec<CacheWarning>) -> Self {
        Self { value, warnings }
    }

    /// Records a warning.
    pub fn warn(&mut self, warning: CacheWarning) {
        self.warnings.push(warning);
    }

    /// Returns the value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the warnings in the order they were raised.
    pub fn warnings(&self) -> &[CacheWarning] {
        &self.warnings
    }

    /// Returns true if any cache operation failed.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Discards the warnings.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Splits into value and warnings.
    pub fn into_parts(self) -> (T, Vec<CacheWarning>) {
        (self.value, self.warnings)
    }

    /// Maps the value, keeping the warnings.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Converts the first warning, if any, into a CacheFailure error.
    pub fn strict(self) -> Result<T, ServiceError> {
        match self.warnings.into_iter().next() {
            Some(warning) => Err(ServiceError::cache_failure(warning.to_string())),
            None => Ok(self.value),
        }
    }
}
