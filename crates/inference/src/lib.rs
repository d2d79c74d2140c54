//! # Doctree Inference
//!
//! The LLM-backed capabilities the tree builder fans out to: dense (and
//! optionally sparse) embeddings, summaries, and keyword extraction.
//!
//! ## Backends
//!
//! ```text
//! InferenceService (async trait)
//!     │
//!     ├──> HttpInference   OpenAI-compatible /embeddings + /chat/completions
//!     │
//!     └──> StubInference   deterministic, offline (tests, dry runs)
//! ```
//!
//! The backend is chosen with `DOCTREE_INFERENCE_MODE` (`http` or `stub`).
//!
//! ## Example
//!
//! ```rust
//! use doctree_inference::{InferenceService, StubInference};
//!
//! # async fn demo() -> doctree_inference::Result<()> {
//! let service = StubInference::new(8);
//! let output = service.embed(&["hello world".to_string()], false).await?;
//! assert_eq!(output.dense[0].len(), 8);
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod mode;
mod service;
mod stub;

pub use error::{InferenceError, Result};
pub use http::{HttpInference, HttpInferenceConfig};
pub use mode::{current_inference_mode_id, service_from_env, InferenceMode};
pub use service::{parse_keywords, EmbedOutput, InferenceService, SparseWeights};
pub use stub::StubInference;
