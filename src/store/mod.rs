//! Document and Part stores
//!
//! The pipeline depends only on the [`DocumentStore`] and [`PartStore`]
//! contracts. Two backends ship with the crate: [`MemoryStore`] for tests and
//! ephemeral runs, and [`SledStore`] for on-disk persistence.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::SledStore;

use crate::error::StorageError;
use crate::types::{Document, DocumentId, DocumentStatus, Part};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Document persistence contract
pub trait DocumentStore: Send + Sync {
    /// Insert a new document; fails with `DuplicateDocument` if the id exists.
    fn create(&self, document: &Document) -> Result<(), StorageError>;

    /// Insert or replace a document. Replacing one is subject to the same
    /// status transition rules as `update_status`.
    fn save(&self, document: &Document) -> Result<(), StorageError>;

    /// Move a document to `status`, enforcing monotonic transitions.
    fn update_status(
        &self,
        id: &DocumentId,
        status: DocumentStatus,
    ) -> Result<Document, StorageError>;

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StorageError>;

    /// Documents of one owner, newest first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>, StorageError>;
}

/// Part persistence contract
///
/// A document holds at most one part per key.
pub trait PartStore: Send + Sync {
    /// Insert a new part; fails with `DuplicatePart` if the key is taken.
    fn create(&self, part: &Part) -> Result<(), StorageError>;

    /// Upsert by (document, key). An existing part keeps its id and creation time.
    fn save(&self, part: &Part) -> Result<Part, StorageError>;

    /// All parts of a document ordered by key.
    fn find_by_document(&self, document_id: &DocumentId) -> Result<Vec<Part>, StorageError>;

    fn find_by_document_and_key(
        &self,
        document_id: &DocumentId,
        key: &str,
    ) -> Result<Option<Part>, StorageError>;
}

/// Apply a status change to a stored document.
pub(crate) fn transition(
    mut document: Document,
    status: DocumentStatus,
) -> Result<Document, StorageError> {
    if !document.status.can_transition_to(status) {
        return Err(StorageError::InvalidStatusTransition {
            document_id: document.id,
            from: document.status,
            to: status,
        });
    }
    if document.status != status {
        document.status = status;
        document.updated_at = Utc::now();
    }
    Ok(document)
}

/// Merge an incoming document onto the stored one (if any) for a save.
pub(crate) fn merge_document(
    existing: Option<Document>,
    incoming: &Document,
) -> Result<Document, StorageError> {
    let mut merged = incoming.clone();
    if let Some(stored) = existing {
        transition(stored.clone(), incoming.status)?;
        merged.created_at = stored.created_at;
    }
    merged.updated_at = Utc::now();
    Ok(merged)
}

/// Merge an incoming part onto the stored one (if any) for an upsert.
pub(crate) fn merge_part(existing: Option<Part>, incoming: &Part) -> Part {
    match existing {
        Some(mut stored) => {
            stored.title = incoming.title.clone();
            stored.content = incoming.content.clone();
            stored.updated_at = Utc::now();
            stored
        }
        None => incoming.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sled,
    Memory,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory; relative paths resolve against the workspace root.
    /// Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sled,
            path: None,
        }
    }
}

impl StorageConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> Result<PathBuf, StorageError> {
        match &self.path {
            Some(path) if path.is_absolute() => Ok(path.clone()),
            Some(path) => Ok(workspace_root.join(path)),
            None => default_data_dir().map(|dir| dir.join("store")),
        }
    }
}

fn default_data_dir() -> Result<PathBuf, StorageError> {
    directories::ProjectDirs::from("", "", "draftsmith")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })
}

/// Both store handles backed by one backend instance.
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub parts: Arc<dyn PartStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            documents: store.clone(),
            parts: store,
        }
    }

    pub fn open(config: &StorageConfig, workspace_root: &Path) -> Result<Self, StorageError> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::memory()),
            StorageBackend::Sled => {
                let path = config.resolve_path(workspace_root)?;
                let store = Arc::new(SledStore::open(&path)?);
                Ok(Self {
                    documents: store.clone(),
                    parts: store,
                })
            }
        }
    }
}
