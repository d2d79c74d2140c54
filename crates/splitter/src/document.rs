use crate::error::{Result, SplitterError};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A local file read into memory, identified by its content checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    pub path: PathBuf,
    /// File name without directories.
    pub name: String,
    /// Lowercased extension, empty when the file has none.
    pub document_type: String,
    /// SHA-256 of the raw bytes, lowercase hex.
    pub checksum: String,
    pub content: String,
}

impl LocalDocument {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = tokio::fs::read(&path).await?;
        let checksum = sha256_hex(&bytes);
        let content = String::from_utf8(bytes).map_err(|_| SplitterError::InvalidUtf8 {
            path: path.display().to_string(),
        })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!(
            "Loaded {} ({} bytes, checksum {})",
            path.display(),
            content.len(),
            checksum
        );

        Ok(Self {
            document_type: document_type(&path),
            path,
            name,
            checksum,
            content,
        })
    }
}

/// Document type derived from the file extension.
pub fn document_type(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
