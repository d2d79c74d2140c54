use crate::backend::StorageBackend;
use crate::document::{DocumentSummary, ReplaceStats, StoredDocument, UpsertStats};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use doctree_core::Node;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Process-local store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn upsert_document(&self, nodes: &[Node]) -> Result<UpsertStats> {
        let fresh = StoredDocument::from_nodes(nodes)?;
        let mut documents = self.documents.write().await;
        let stats = documents
            .entry(fresh.document_id.clone())
            .or_insert(fresh)
            .upsert(nodes);
        Ok(stats)
    }

    async fn replace_document(&self, nodes: &[Node]) -> Result<ReplaceStats> {
        let mut fresh = StoredDocument::from_nodes(nodes)?;
        let mut documents = self.documents.write().await;
        let discarded = documents
            .get(&fresh.document_id)
            .map_or(0, |previous| previous.nodes.len());
        let written = fresh.upsert(nodes).inserted;
        documents.insert(fresh.document_id.clone(), fresh);
        Ok(ReplaceStats { written, discarded })
    }

    async fn load_document(&self, document_id: &str) -> Result<StoredDocument> {
        self.documents
            .read()
            .await
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(document_id))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .map(StoredDocument::summary)
            .collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool> {
        Ok(self.documents.write().await.remove(document_id).is_some())
    }
}
