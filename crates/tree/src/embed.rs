use crate::config::TreeConfig;
use crate::error::{Result, TreeError};
use crate::node::Node;
use doctree_inference::InferenceService;
use tokio_util::sync::CancellationToken;

/// Sequential batch embedding over a finished tree.
///
/// Nodes without text keep their filler vector. Each batch is one call to
/// the service; a short, long or wrongly sized response aborts the build.
pub struct BatchEmbedder<'a> {
    service: &'a dyn InferenceService,
    dimensions: usize,
    batch_size: usize,
    sparse: bool,
}

impl<'a> BatchEmbedder<'a> {
    pub fn new(service: &'a dyn InferenceService, config: &TreeConfig) -> Self {
        Self {
            service,
            dimensions: config.embedding_dimensions,
            batch_size: config.embedding_batch_size.max(1),
            sparse: config.sparse_embeddings,
        }
    }

    /// Embed every node with text. Returns how many nodes were embedded.
    pub async fn embed_all<'n>(
        &self,
        nodes: impl Iterator<Item = &'n mut Node>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut targets: Vec<&'n mut Node> = nodes.filter(|node| node.has_text()).collect();
        let total = targets.len();
        let batches = total.div_ceil(self.batch_size);

        for (batch_idx, batch) in targets.chunks_mut(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|node| node.text.clone()).collect();
            let output = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TreeError::Cancelled),
                output = self.service.embed(&texts, self.sparse) => output?,
            };

            if output.dense.len() != texts.len() {
                return Err(TreeError::malformed(format!(
                    "embedding batch {batch_idx}: expected {} vectors, got {}",
                    texts.len(),
                    output.dense.len()
                )));
            }
            if let Some(bad) = output.dense.iter().find(|v| v.len() != self.dimensions) {
                return Err(TreeError::malformed(format!(
                    "embedding batch {batch_idx}: expected dimension {}, got {}",
                    self.dimensions,
                    bad.len()
                )));
            }

            let mut sparse = match output.sparse {
                Some(weights) if weights.len() == texts.len() => Some(weights.into_iter()),
                Some(weights) => {
                    return Err(TreeError::malformed(format!(
                        "embedding batch {batch_idx}: expected {} sparse entries, got {}",
                        texts.len(),
                        weights.len()
                    )))
                }
                None => {
                    if self.sparse {
                        log::warn!("Embedding batch {batch_idx} returned no sparse weights");
                    }
                    None
                }
            };

            for (node, vector) in batch.iter_mut().zip(output.dense) {
                node.embedding = vector;
                if let Some(weights) = sparse.as_mut().and_then(Iterator::next) {
                    node.sparse_weights = Some(weights);
                }
            }
            log::debug!(
                "Embedded batch {}/{batches} ({} texts)",
                batch_idx + 1,
                texts.len()
            );
        }

        Ok(total)
    }
}
