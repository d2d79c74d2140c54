//! # Doctree Store
//!
//! Persistence for finished document trees behind [`StorageBackend`]:
//! an in-memory map and a directory of schema-versioned JSON files.

pub mod backend;
pub mod document;
pub mod error;
pub mod json;
pub mod memory;

pub use backend::StorageBackend;
pub use document::{DocumentSummary, ReplaceStats, StoredDocument, UpsertStats};
pub use error::{Result, StoreError};
pub use json::{JsonFileStore, DOCUMENT_SCHEMA_VERSION};
pub use memory::MemoryStore;
