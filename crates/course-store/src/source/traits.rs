//! Document store trait definition.

use async_trait::async_trait;
use course_core::RequestContext;

use super::{Document, Selector};
use crate::error::StoreError;

/// A durable store of JSON documents grouped in named collections.
///
/// This trait abstracts over storage backends (SQLite, in-memory, a
/// document database, ...) so the service layer can read and write records
/// without knowing how they are persisted.
///
/// Every data operation receives the caller's [`RequestContext`]. Callers
/// bound the total duration of each call themselves; backends may also use
/// the context to stop early once it is cancelled.
///
/// # Implementors
///
/// - `MemoryStore` - Collections held in process memory
/// - `SqliteStore` - Documents persisted in a SQLite database
///
/// # Example
///
/// ```ignore
/// use course_store::{DocumentStore, Selector};
///
/// let doc = store
///     .find_one(&ctx, "course", &Selector::eq("name", "algebra"))
///     .await?;
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the first document matching `selector`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no document matches
    async fn find_one(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Document, StoreError>;

    /// Returns every document matching `selector`, in insertion order.
    /// No match is an empty vector, not an error.
    async fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, StoreError>;

    /// Stores a new document.
    ///
    /// # Errors
    ///
    /// - `StoreError::Duplicate` if a unique index rejects the document
    async fn insert(
        &self,
        ctx: &RequestContext,
        collection: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Merges `update` into the first document matching `selector`.
    ///
    /// Fields present in `update` replace the stored values, other fields
    /// are left untouched.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no document matches
    /// - `StoreError::Duplicate` if the merged document violates a unique index
    async fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
        update: Document,
    ) -> Result<(), StoreError>;

    /// Removes the first document matching `selector`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no document matches
    async fn remove(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<(), StoreError>;

    /// Counts the documents matching `selector`.
    async fn count(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<u64, StoreError>;

    /// Ensures an index on `field` exists, optionally enforcing uniqueness.
    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError>;

    /// Performs a health check on the store.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Returns the name of this store, used for logging and identification.
    fn name(&self) -> &str;
}
