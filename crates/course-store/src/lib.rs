//! # Course Store
//!
//! Persistent document store for the course management service.
//!
//! The store is the single source of truth. This crate defines the narrow
//! [`DocumentStore`] capability the service layer depends on (read/write of
//! JSON documents by key-value selector) and ships two backends:
//!
//! - [`MemoryStore`] - process-local collections, used for tests and for
//!   running the service without external infrastructure
//! - [`SqliteStore`] - documents persisted in SQLite through `sqlx`
//!
//! ## Example
//!
//! ```ignore
//! use course_core::RequestContext;
//! use course_store::{DocumentStore, MemoryStore, Selector, to_document};
//!
//! let store = MemoryStore::new();
//! let ctx = RequestContext::background();
//!
//! store.insert(&ctx, "course", to_document(&course)?).await?;
//! let doc = store.find_one(&ctx, "course", &Selector::eq("name", "algebra")).await?;
//! ```

pub mod backend;
pub mod error;
pub mod source;

// Re-exports
pub use backend::{MemoryStore, SqliteStore};
pub use error::StoreError;
pub use source::{Document, DocumentStore, Selector, from_document, merge_document, to_document};

// Re-export course_core for consumers
pub use course_core;
