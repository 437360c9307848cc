//! Error types for document loading.

use thiserror::Error;

/// Errors that can occur while loading or assembling a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown node '{name}' referenced in graph '{graph}'")]
    DanglingReference { graph: String, name: String },

    #[error("Duplicate path: {0}")]
    DuplicatePath(String),

    #[error("Entity {0} no longer exists")]
    Expired(String),
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;
