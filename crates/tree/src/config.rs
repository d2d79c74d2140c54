use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};

/// Knobs for one document tree build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Dimension of every dense embedding in the tree.
    pub embedding_dimensions: usize,

    /// Fold leaves upward through summaries; when off the tree is flat
    /// (root + leaves).
    pub get_summary: bool,

    /// Attach extracted keywords to every node.
    pub get_keywords: bool,

    /// Keywords requested per node.
    pub num_keywords: usize,

    /// Token ceiling for the concatenated summaries of one fold branch.
    pub branch_token_budget: usize,

    /// Concurrent inference workers.
    pub pool_size: usize,

    /// Bounded work queue capacity; submission waits when it is full.
    pub queue_capacity: usize,

    /// Texts per batch embedding request.
    pub embedding_batch_size: usize,

    /// Upper bound on fold iterations before the build fails.
    pub max_fold_iterations: usize,

    /// Ask the service for sparse lexical weights alongside dense vectors.
    pub sparse_embeddings: bool,

    /// Component value of the filler embedding given to nodes without text.
    /// Must be non-zero so storage backends keep those nodes.
    pub filler_value: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            embedding_dimensions: 1536,
            get_summary: false,
            get_keywords: false,
            num_keywords: 5,
            branch_token_budget: 1000,
            pool_size: 8,
            queue_capacity: 40,
            embedding_batch_size: 100,
            max_fold_iterations: 32,
            sparse_embeddings: false,
            filler_value: 0.5,
        }
    }
}

impl TreeConfig {
    /// Root + leaves, no summaries.
    pub fn flat(embedding_dimensions: usize) -> Self {
        Self {
            embedding_dimensions,
            get_summary: false,
            ..Default::default()
        }
    }

    /// Summaries folded upward under a per-branch token budget.
    pub fn summarized(embedding_dimensions: usize, branch_token_budget: usize) -> Self {
        Self {
            embedding_dimensions,
            get_summary: true,
            branch_token_budget,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, num_keywords: usize) -> Self {
        self.get_keywords = true;
        self.num_keywords = num_keywords;
        self
    }

    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimensions == 0 {
            return Err(TreeError::invalid_config("embedding_dimensions must be > 0"));
        }
        if self.pool_size == 0 {
            return Err(TreeError::invalid_config("pool_size must be > 0"));
        }
        if self.queue_capacity == 0 {
            return Err(TreeError::invalid_config("queue_capacity must be > 0"));
        }
        if self.embedding_batch_size == 0 {
            return Err(TreeError::invalid_config("embedding_batch_size must be > 0"));
        }
        if self.get_summary && self.branch_token_budget == 0 {
            return Err(TreeError::invalid_config(
                "branch_token_budget must be > 0 when get_summary is enabled",
            ));
        }
        if self.get_summary && self.max_fold_iterations == 0 {
            return Err(TreeError::invalid_config("max_fold_iterations must be > 0"));
        }
        if self.get_keywords && self.num_keywords == 0 {
            return Err(TreeError::invalid_config(
                "num_keywords must be > 0 when get_keywords is enabled",
            ));
        }
        if self.filler_value == 0.0 || !self.filler_value.is_finite() {
            return Err(TreeError::invalid_config(format!(
                "filler_value must be finite and non-zero (got {})",
                self.filler_value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_presets_valid() {
        assert!(TreeConfig::default().validate().is_ok());
        assert!(TreeConfig::flat(8).validate().is_ok());
        assert!(TreeConfig::summarized(8, 64).with_keywords(3).validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TreeConfig::flat(0);
        assert!(config.validate().is_err());

        config.embedding_dimensions = 4;
        config.pool_size = 0;
        assert!(config.validate().is_err());

        config.pool_size = 2;
        config.get_keywords = true;
        config.num_keywords = 0;
        assert!(config.validate().is_err());

        config.num_keywords = 3;
        config.filler_value = 0.0;
        assert!(config.validate().is_err());

        config.filler_value = 0.5;
        assert!(config.validate().is_ok());

        // The budget only matters when folding.
        config.branch_token_budget = 0;
        assert!(config.validate().is_ok());
        config.get_summary = true;
        assert!(config.validate().is_err());
    }
}
