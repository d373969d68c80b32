use std::io;

use thiserror::Error;

use crate::types::{CollectionPath, DocumentId};

/// Error type for document-store access, configuration, and IO failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("collection '{collection}' is unavailable: {reason}")]
    SourceUnavailable {
        collection: CollectionPath,
        reason: String,
    },
    #[error("document '{id}' in collection '{collection}' is malformed: {details}")]
    MalformedDocument {
        collection: CollectionPath,
        id: DocumentId,
        details: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
