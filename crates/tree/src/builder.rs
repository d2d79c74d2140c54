use crate::assembler::TreeAssembler;
use crate::config::TreeConfig;
use crate::embed::BatchEmbedder;
use crate::error::{Result, TreeError};
use crate::level::LevelBuilder;
use crate::node::{Level, Node};
use crate::pool::WorkerPool;
use crate::sequencer::ChunkSequencer;
use crate::validate::validate_tree;
use doctree_inference::InferenceService;
use doctree_splitter::TokenCounter;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Builds document trees against one inference backend and token counter.
#[derive(Clone)]
pub struct DocumentTreeBuilder {
    config: TreeConfig,
    service: Arc<dyn InferenceService>,
    counter: Arc<dyn TokenCounter>,
}

impl DocumentTreeBuilder {
    pub fn new(
        config: TreeConfig,
        service: Arc<dyn InferenceService>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            service,
            counter,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub async fn build<S: AsRef<str>>(
        &self,
        document_name: &str,
        document_id: &str,
        chunks: &[S],
    ) -> Result<Vec<Node>> {
        self.build_with_cancel(document_name, document_id, chunks, &CancellationToken::new())
            .await
    }

    /// Build the tree for one document. Returns every node, root first, or
    /// the first error; a partial tree is never returned.
    pub async fn build_with_cancel<S: AsRef<str>>(
        &self,
        document_name: &str,
        document_id: &str,
        chunks: &[S],
        cancel: &CancellationToken,
    ) -> Result<Vec<Node>> {
        if chunks.is_empty() {
            return Err(TreeError::EmptyDocument);
        }
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let started = Instant::now();
        log::info!(
            "Building tree for {document_name} ({document_id}): {} chunks, summaries={}, keywords={}",
            chunks.len(),
            self.config.get_summary,
            self.config.get_keywords
        );

        let sequencer = ChunkSequencer::new(
            document_id,
            document_name,
            self.config.embedding_dimensions,
            self.config.filler_value,
        );
        let leaves = sequencer.sequence(chunks, Level::Leaf);
        let mut assembler = TreeAssembler::new(sequencer.root(), leaves);

        let cancel = cancel.child_token();
        let pool = WorkerPool::start(
            self.service.clone(),
            self.config.pool_size,
            self.config.queue_capacity,
            cancel.clone(),
        );
        let shaped = self
            .shape(&pool, &sequencer, &mut assembler, &cancel)
            .await;
        pool.shutdown().await;
        let folds = shaped?;

        let embedded = BatchEmbedder::new(self.service.as_ref(), &self.config)
            .embed_all(assembler.nodes_mut(), &cancel)
            .await?;

        let nodes = assembler.finish();
        let report = validate_tree(&nodes).into_result()?;

        log::info!(
            "Built tree for {document_name}: {} nodes, depth {}, {folds} folds, {embedded} embedded in {:.2?}",
            report.node_count,
            report.depth,
            started.elapsed()
        );
        Ok(nodes)
    }

    /// Enrich leaves and give the tree its shape. Returns the fold count.
    async fn shape(
        &self,
        pool: &WorkerPool,
        sequencer: &ChunkSequencer,
        assembler: &mut TreeAssembler,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let levels = LevelBuilder::new(
            pool,
            sequencer,
            self.counter.as_ref(),
            &self.config,
            cancel,
        );

        levels
            .enrich(assembler.current_tier_mut(), self.config.get_summary)
            .await?;

        if self.config.get_summary {
            levels.fold(assembler).await
        } else {
            assembler.adopt_current_tier_into_root();
            Ok(0)
        }
    }
}

/// Build one document's tree with a fresh worker pool.
pub async fn build_document_tree<S: AsRef<str>>(
    document_name: &str,
    document_id: &str,
    chunks: &[S],
    config: &TreeConfig,
    service: Arc<dyn InferenceService>,
    counter: Arc<dyn TokenCounter>,
) -> Result<Vec<Node>> {
    DocumentTreeBuilder::new(config.clone(), service, counter)?
        .build(document_name, document_id, chunks)
        .await
}

/// [`build_document_tree`] that stops with [`TreeError::Cancelled`] once
/// `cancel` fires.
pub async fn build_document_tree_with_cancel<S: AsRef<str>>(
    document_name: &str,
    document_id: &str,
    chunks: &[S],
    config: &TreeConfig,
    service: Arc<dyn InferenceService>,
    counter: Arc<dyn TokenCounter>,
    cancel: CancellationToken,
) -> Result<Vec<Node>> {
    DocumentTreeBuilder::new(config.clone(), service, counter)?
        .build_with_cancel(document_name, document_id, chunks, &cancel)
        .await
}
