use serde::{Deserialize, Serialize};

/// Configuration for token-budgeted text splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum chunk size in tokens
    pub chunk_size: usize,

    /// Tokens shared between the tail of one chunk and the head of the next
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

impl SplitterConfig {
    /// Smaller chunks sized for embedding models
    pub fn for_embeddings() -> Self {
        Self {
            chunk_size: 384,
            chunk_overlap: 32,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        Ok(())
    }
}
