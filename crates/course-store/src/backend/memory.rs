//! In-memory document store.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use course_core::RequestContext;
use parking_lot::RwLock;
use tracing::debug;

use super::check_cancelled;
use crate::error::StoreError;
use crate::source::{Document, DocumentStore, Selector, merge_document};

/// A document store held entirely in process memory.
///
/// Collections keep insertion order. Unique indexes declared with
/// [`DocumentStore::ensure_index`] are enforced on insert and update.
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique_fields: BTreeSet<String>,
}

impl Collection {
    /// Returns the first unique field whose value in `candidate` is already
    /// taken by a document other than the one at `skip`.
    fn unique_violation(&self, candidate: &Document, skip: Option<usize>) -> Option<&str> {
        self.unique_fields
            .iter()
            .find(|field| {
                let Some(value) = candidate.get(field.as_str()) else {
                    return false;
                };
                self.documents
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != skip)
                    .any(|(_, doc)| doc.get(field.as_str()) == Some(value))
            })
            .map(String::as_str)
    }

    fn position(&self, selector: &Selector) -> Option<usize> {
        self.documents.iter().position(|doc| selector.matches(doc))
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections
            .read()
            .values()
            .map(|c| c.documents.len())
            .sum()
    }

    /// Returns true if no collection holds a document.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Document, StoreError> {
        check_cancelled(ctx)?;
        let collections = self.collections.read();

        collections
            .get(collection)
            .and_then(|c| c.documents.iter().find(|doc| selector.matches(doc)))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection))
    }

    async fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, StoreError> {
        check_cancelled(ctx)?;
        let collections = self.collections.read();

        Ok(collections
            .get(collection)
            .map(|c| {
                c.documents
                    .iter()
                    .filter(|doc| selector.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(
        &self,
        ctx: &RequestContext,
        collection: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;
        let mut collections = self.collections.write();
        let entry = collections.entry(collection.to_string()).or_default();

        if let Some(field) = entry.unique_violation(&document, None) {
            return Err(StoreError::duplicate(collection, field));
        }

        entry.documents.push(document);
        debug!(collection = %collection, "Document inserted");
        Ok(())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
        update: Document,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;
        let mut collections = self.collections.write();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        let index = entry
            .position(selector)
            .ok_or_else(|| StoreError::not_found(collection))?;

        let mut merged = entry.documents[index].clone();
        merge_document(&mut merged, update);

        if let Some(field) = entry.unique_violation(&merged, Some(index)) {
            return Err(StoreError::duplicate(collection, field));
        }

        entry.documents[index] = merged;
        debug!(collection = %collection, selector = %selector, "Document updated");
        Ok(())
    }

    async fn remove(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;
        let mut collections = self.collections.write();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        let index = entry
            .position(selector)
            .ok_or_else(|| StoreError::not_found(collection))?;

        entry.documents.remove(index);
        debug!(collection = %collection, selector = %selector, "Document removed");
        Ok(())
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<u64, StoreError> {
        check_cancelled(ctx)?;
        let collections = self.collections.read();

        Ok(collections
            .get(collection)
            .map(|c| c.documents.iter().filter(|doc| selector.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError> {
        if !unique {
            // Lookups scan the collection anyway.
            return Ok(());
        }

        let mut collections = self.collections.write();
        let entry = collections.entry(collection.to_string()).or_default();

        let mut seen = Vec::new();
        for value in entry.documents.iter().filter_map(|doc| doc.get(field)) {
            if seen.contains(&value) {
                return Err(StoreError::duplicate(collection, field));
            }
            seen.push(value);
        }

        entry.unique_fields.insert(field.to_string());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
