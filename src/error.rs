//! Error types for the draftsmith generation pipeline.

use crate::types::{DocumentId, DocumentStatus};
use std::time::Duration;
use thiserror::Error;

/// Failures raised at the provider boundary.
///
/// Adapters classify every failure into one of these two variants; the retry
/// policy in the generation client never inspects message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Rate, quota or availability condition that is worth retrying.
    #[error("Provider temporarily unavailable: {message}")]
    Transient {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Non-retryable failure (bad credentials, unknown model, malformed request).
    #[error("Provider request failed: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        ProviderError::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient_after(message: impl Into<String>, retry_after: Duration) -> Self {
        ProviderError::Transient {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        ProviderError::Fatal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }

    /// Delay suggested by the provider, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::Transient { retry_after, .. } => *retry_after,
            ProviderError::Fatal(_) => None,
        }
    }
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Document already exists: {0}")]
    DuplicateDocument(DocumentId),

    #[error("Part '{key}' already exists for document {document_id}")]
    DuplicatePart { document_id: DocumentId, key: String },

    #[error("Invalid status transition for document {document_id}: {from} -> {to}")]
    InvalidStatusTransition {
        document_id: DocumentId,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors surfaced by the pipeline and its callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
