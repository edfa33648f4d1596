//! Error types for persistent stores.

use std::time::Duration;

use course_core::Interrupted;

/// Errors that can occur when working with a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document matched the selector.
    #[error("document not found in collection '{collection}'")]
    NotFound { collection: String },

    /// A unique index rejected the write.
    #[error("duplicate value for unique field '{field}' in collection '{collection}'")]
    Duplicate { collection: String, field: String },

    /// The selector or collection name cannot be used by this backend.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A document could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The SQL driver failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store is not reachable.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The call did not complete within its budget.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The request was cancelled while the call was in flight.
    #[error("store operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Creates a new not found error.
    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
        }
    }

    /// Creates a new duplicate key error.
    pub fn duplicate(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Duplicate {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Creates a new store unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true if no document matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if a unique index rejected the write.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns true if the call was cut short by its deadline or by
    /// cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled)
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout(_) | Self::Cancelled
        )
    }
}

impl From<Interrupted> for StoreError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::DeadlineExceeded(budget) => Self::Timeout(budget),
            Interrupted::Cancelled => Self::Cancelled,
        }
    }
}
