use crate::document::{DocumentSummary, ReplaceStats, StoredDocument, UpsertStats};
use crate::error::Result;
use async_trait::async_trait;
use doctree_core::Node;

/// Where finished trees go.
///
/// Nodes are upserted one by one, keyed by guid. A rebuilt tree carries
/// fresh guids, so storing it goes through `replace_document`; upserting it
/// would leave the old tree's nodes next to the new ones.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert or replace `nodes`, which must all belong to one document.
    async fn upsert_document(&self, nodes: &[Node]) -> Result<UpsertStats>;

    /// Store `nodes` as the complete document, discarding any previous
    /// version with the same id.
    async fn replace_document(&self, nodes: &[Node]) -> Result<ReplaceStats>;

    async fn load_document(&self, document_id: &str) -> Result<StoredDocument>;

    /// Stored documents ordered by id.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// `false` when the document was not stored.
    async fn delete_document(&self, document_id: &str) -> Result<bool>;
}
