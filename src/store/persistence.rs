//! Sled-backed document and part store

use crate::error::StorageError;
use crate::store::{merge_document, merge_part, transition, DocumentStore, PartStore};
use crate::types::{Document, DocumentId, DocumentStatus, Part};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const DOCUMENTS_TREE: &str = "documents";
const PARTS_TREE: &str = "parts";

/// Sled implementation of [`DocumentStore`] and [`PartStore`]
///
/// Documents are keyed by their 16 uuid bytes. Parts are keyed by the owning
/// document's uuid bytes followed by the part key, which makes the
/// (document, key) pair unique and lets `find_by_document` run as a prefix scan.
pub struct SledStore {
    db: sled::Db,
    documents: sled::Tree,
    parts: sled::Tree,
    /// Serializes read-modify-write sequences.
    write_lock: Mutex<()>,
}

fn backend_err(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{}: {}", context, e))
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value)
        .map_err(|e| StorageError::Serialization(format!("Failed to serialize {}: {}", what, e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| StorageError::Serialization(format!("Failed to deserialize {}: {}", what, e)))
}

fn part_key(document_id: &DocumentId, key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16 + key.len());
    bytes.extend_from_slice(document_id.as_bytes());
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database at {}: {}", path.display(), e),
            ))
        })?;
        let documents = db
            .open_tree(DOCUMENTS_TREE)
            .map_err(|e| backend_err("Failed to open documents tree", e))?;
        let parts = db
            .open_tree(PARTS_TREE)
            .map_err(|e| backend_err("Failed to open parts tree", e))?;
        Ok(Self {
            db,
            documents,
            parts,
            write_lock: Mutex::new(()),
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| backend_err("Failed to flush database", e))?;
        Ok(())
    }

    fn read_document(&self, id: &DocumentId) -> Result<Option<Document>, StorageError> {
        self.documents
            .get(id.as_bytes())
            .map_err(|e| backend_err("Failed to get document", e))?
            .map(|bytes| decode(&bytes, "document"))
            .transpose()
    }

    fn write_document(&self, document: &Document) -> Result<(), StorageError> {
        let value = encode(document, "document")?;
        self.documents
            .insert(document.id.as_bytes(), value)
            .map_err(|e| backend_err("Failed to put document", e))?;
        Ok(())
    }

    fn read_part(&self, key: &[u8]) -> Result<Option<Part>, StorageError> {
        self.parts
            .get(key)
            .map_err(|e| backend_err("Failed to get part", e))?
            .map(|bytes| decode(&bytes, "part"))
            .transpose()
    }
}

impl DocumentStore for SledStore {
    fn create(&self, document: &Document) -> Result<(), StorageError> {
        let value = encode(document, "document")?;
        let _guard = self.write_lock.lock();
        let swapped = self
            .documents
            .compare_and_swap(document.id.as_bytes(), None as Option<&[u8]>, Some(value))
            .map_err(|e| backend_err("Failed to create document", e))?;
        swapped.map_err(|_| StorageError::DuplicateDocument(document.id))
    }

    fn save(&self, document: &Document) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let merged = merge_document(self.read_document(&document.id)?, document)?;
        self.write_document(&merged)
    }

    fn update_status(
        &self,
        id: &DocumentId,
        status: DocumentStatus,
    ) -> Result<Document, StorageError> {
        let _guard = self.write_lock.lock();
        let current = self
            .read_document(id)?
            .ok_or(StorageError::DocumentNotFound(*id))?;
        let updated = transition(current, status)?;
        self.write_document(&updated)?;
        Ok(updated)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StorageError> {
        self.read_document(id)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>, StorageError> {
        let mut owned = Vec::new();
        for item in self.documents.iter() {
            let (_, value) = item.map_err(|e| backend_err("Failed to iterate documents", e))?;
            let document: Document = decode(&value, "document")?;
            if document.owner_id == owner_id {
                owned.push(document);
            }
        }
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }
}

impl PartStore for SledStore {
    fn create(&self, part: &Part) -> Result<(), StorageError> {
        let key = part_key(&part.document_id, &part.key);
        let value = encode(part, "part")?;
        let _guard = self.write_lock.lock();
        let swapped = self
            .parts
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))
            .map_err(|e| backend_err("Failed to create part", e))?;
        swapped.map_err(|_| StorageError::DuplicatePart {
            document_id: part.document_id,
            key: part.key.clone(),
        })
    }

    fn save(&self, part: &Part) -> Result<Part, StorageError> {
        let key = part_key(&part.document_id, &part.key);
        let _guard = self.write_lock.lock();
        let merged = merge_part(self.read_part(&key)?, part);
        let value = encode(&merged, "part")?;
        self.parts
            .insert(key, value)
            .map_err(|e| backend_err("Failed to put part", e))?;
        Ok(merged)
    }

    fn find_by_document(&self, document_id: &DocumentId) -> Result<Vec<Part>, StorageError> {
        let mut parts = Vec::new();
        for item in self.parts.scan_prefix(document_id.as_bytes()) {
            let (_, value) = item.map_err(|e| backend_err("Failed to scan parts", e))?;
            parts.push(decode::<Part>(&value, "part")?);
        }
        // Byte order of the key suffix equals string order.
        Ok(parts)
    }

    fn find_by_document_and_key(
        &self,
        document_id: &DocumentId,
        key: &str,
    ) -> Result<Option<Part>, StorageError> {
        self.read_part(&part_key(document_id, key))
    }
}
