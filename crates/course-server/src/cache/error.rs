//! Cache error types.

use std::time::Duration;

use course_core::Interrupted;
use thiserror::Error;

/// Errors returned by a [`Cache`](super::Cache) backend.
///
/// The service treats every variant the same way, as a miss on reads and as a
/// warning on writes; the variants exist for logging and metrics.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is not present (or has expired).
    #[error("cache miss")]
    Miss,

    /// The backend could not be reached or rejected the command.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its budget.
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// The request was cancelled while the call was in flight.
    #[error("cache operation cancelled")]
    Cancelled,
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    /// Short label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Miss => "miss",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<Interrupted> for CacheError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::DeadlineExceeded(budget) => Self::Timeout(budget),
            Interrupted::Cancelled => Self::Cancelled,
        }
    }
}

impl From<::redis::RedisError> for CacheError {
    fn from(err: ::redis::RedisError) -> Self {
        if err.is_timeout() {
            // The connection manager's own timeout carries no budget.
            Self::Timeout(Duration::ZERO)
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}
