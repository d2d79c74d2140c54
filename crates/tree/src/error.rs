use doctree_inference::InferenceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Failures that abort a tree build. A build either returns every node or one
/// of these; partial trees are never returned.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Document has no chunks")]
    EmptyDocument,

    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("Summary folding did not converge to a single root after {iterations} iterations")]
    FoldLimitExceeded { iterations: usize },

    #[error("Tree build cancelled")]
    Cancelled,

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("Tree invariant violated: {0}")]
    Invariant(String),
}

impl TreeError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}
