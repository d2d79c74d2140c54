use crate::backend::StorageBackend;
use crate::document::{DocumentSummary, ReplaceStats, StoredDocument, UpsertStats};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use doctree_core::Node;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDocument {
    schema_version: u32,
    document: StoredDocument,
}

/// One pretty-printed JSON file per document under a root directory.
///
/// Writes go to a sibling `.json.tmp` file that is renamed over the target,
/// so readers never observe a half-written document.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `document_id`. Bytes outside `[A-Za-z0-9_-]` are written
    /// as `%XX`, so distinct ids never share a file.
    #[must_use]
    pub fn document_path(&self, document_id: &str) -> PathBuf {
        let mut file_stem = String::with_capacity(document_id.len());
        for byte in document_id.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
                file_stem.push(char::from(byte));
            } else {
                let _ = write!(file_stem, "%{byte:02X}");
            }
        }
        self.root.join(format!("{file_stem}.json"))
    }

    async fn read(&self, path: &Path) -> Result<StoredDocument> {
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedDocument = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != DOCUMENT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: persisted.schema_version,
                expected: DOCUMENT_SCHEMA_VERSION,
            });
        }
        Ok(persisted.document)
    }

    async fn write(&self, document: &StoredDocument) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.document_path(&document.document_id);
        let persisted = PersistedDocument {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            document: document.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn load_existing(&self, document_id: &str) -> Result<Option<StoredDocument>> {
        let path = self.document_path(document_id);
        match self.read(&path).await {
            Ok(document) if document.document_id == document_id => Ok(Some(document)),
            Ok(document) => Err(StoreError::IdConflict {
                requested: document_id.to_string(),
                stored: document.document_id,
            }),
            Err(StoreError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl StorageBackend for JsonFileStore {
    async fn upsert_document(&self, nodes: &[Node]) -> Result<UpsertStats> {
        let fresh = StoredDocument::from_nodes(nodes)?;
        let _guard = self.write_lock.lock().await;

        let mut document = self
            .load_existing(&fresh.document_id)
            .await?
            .unwrap_or(fresh);
        let stats = document.upsert(nodes);
        self.write(&document).await?;

        log::debug!(
            "Stored {} ({} inserted, {} replaced) at {}",
            document.document_id,
            stats.inserted,
            stats.replaced,
            self.document_path(&document.document_id).display()
        );
        Ok(stats)
    }

    async fn replace_document(&self, nodes: &[Node]) -> Result<ReplaceStats> {
        let mut document = StoredDocument::from_nodes(nodes)?;
        let _guard = self.write_lock.lock().await;

        let discarded = self
            .load_existing(&document.document_id)
            .await?
            .map_or(0, |previous| previous.nodes.len());
        let written = document.upsert(nodes).inserted;
        self.write(&document).await?;

        log::debug!(
            "Replaced {} ({} written, {} discarded) at {}",
            document.document_id,
            written,
            discarded,
            self.document_path(&document.document_id).display()
        );
        Ok(ReplaceStats { written, discarded })
    }

    async fn load_document(&self, document_id: &str) -> Result<StoredDocument> {
        self.load_existing(document_id)
            .await?
            .ok_or_else(|| StoreError::not_found(document_id))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read(&path).await {
                Ok(document) => summaries.push(document.summary()),
                Err(err) => log::warn!("Skipping unreadable document {}: {err}", path.display()),
            }
        }
        summaries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(summaries)
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.load_existing(document_id).await?.is_none() {
            return Ok(false);
        }
        tokio::fs::remove_file(self.document_path(document_id)).await?;
        Ok(true)
    }
}
