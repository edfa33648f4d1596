//! Document store abstraction.
//!
//! This module defines the core trait for persistent stores and the
//! document and selector types it operates on.

mod document;
mod selector;
mod traits;

pub use document::{Document, from_document, merge_document, to_document};
pub use selector::Selector;
pub(crate) use selector::validate_identifier;
pub use traits::DocumentStore;
