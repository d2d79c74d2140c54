//! # Doctree Core
//!
//! Builds a hierarchical tree out of one document's ordered chunks.
//!
//! ```text
//! chunks ──> ChunkSequencer ──> leaf tier
//!                                  │
//!              ┌───────────────────┘
//!              ▼
//!        LevelBuilder ──rounds──> WorkerPool ──> InferenceService
//!   (summaries, keywords, folds)
//!              │
//!              ▼
//!        BatchEmbedder ──batches──> InferenceService
//!              │
//!              ▼
//!        TreeAssembler ──> [root, leaves.., internal tiers..]
//! ```
//!
//! With summaries off the tree is flat: the root adopts every leaf. With
//! summaries on, each fold groups adjacent summaries under a token budget,
//! summarizes each group into a parent, and repeats until one group is
//! left; that group is merged into the root.
//!
//! ## Example
//!
//! ```no_run
//! use doctree_core::{build_document_tree, TreeConfig};
//! use doctree_inference::StubInference;
//! use doctree_splitter::WordTokenCounter;
//! use std::sync::Arc;
//!
//! # async fn example() -> doctree_core::Result<()> {
//! let config = TreeConfig::summarized(8, 64).with_pool_size(4);
//! let nodes = build_document_tree(
//!     "guide.md",
//!     "doc-1",
//!     &["first chunk", "second chunk"],
//!     &config,
//!     Arc::new(StubInference::new(8)),
//!     Arc::new(WordTokenCounter),
//! )
//! .await?;
//! assert_eq!(nodes[0].level, doctree_core::Level::Root);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod builder;
pub mod config;
pub mod embed;
pub mod error;
pub mod level;
pub mod node;
pub mod pool;
pub mod sequencer;
pub mod validate;

pub use assembler::TreeAssembler;
pub use builder::{build_document_tree, build_document_tree_with_cancel, DocumentTreeBuilder};
pub use config::TreeConfig;
pub use embed::BatchEmbedder;
pub use error::{Result, TreeError};
pub use level::{partition_branches, Branch, LevelBuilder};
pub use node::{filler_embedding, link_siblings, Level, Node};
pub use pool::{WorkKind, WorkOutput, WorkRequest, WorkResult, WorkerPool};
pub use sequencer::ChunkSequencer;
pub use validate::{validate_tree, TreeReport};
