use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unsupported document schema_version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("File for document {requested:?} holds document {stored:?}")]
    IdConflict { requested: String, stored: String },
}

impl StoreError {
    pub fn not_found(document_id: impl Into<String>) -> Self {
        Self::NotFound(document_id.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }
}
