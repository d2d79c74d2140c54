//! # Doctree Splitter
//!
//! Token-aware splitting of plain documents into the ordered chunk list the
//! tree builder consumes.
//!
//! ## Pipeline
//!
//! ```text
//! Local file (or DocumentScanner over a directory)
//!     │
//!     ├──> LocalDocument::load
//!     │      ├─> document type (extension)
//!     │      └─> SHA-256 checksum (document id)
//!     │
//!     └──> TextSplitter (TokenCounter)
//!            └─> Vec<String> chunks, bounded by chunk_size tokens
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use doctree_splitter::{SplitterConfig, TextSplitter, WordTokenCounter};
//!
//! let config = SplitterConfig { chunk_size: 4, chunk_overlap: 1 };
//! let splitter = TextSplitter::new(config, Arc::new(WordTokenCounter)).unwrap();
//!
//! let chunks = splitter.split("one two three four five six seven");
//! assert_eq!(chunks[0], "one two three four");
//! ```

mod config;
mod document;
mod error;
mod scanner;
mod splitter;
mod tokens;

pub use config::SplitterConfig;
pub use document::{document_type, sha256_hex, LocalDocument};
pub use error::{Result, SplitterError};
pub use scanner::DocumentScanner;
pub use splitter::TextSplitter;
pub use tokens::{HeuristicTokenCounter, HfTokenCounter, TokenCounter, WordTokenCounter};
