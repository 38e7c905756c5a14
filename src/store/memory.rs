//! In-memory store

use crate::error::StorageError;
use crate::store::{merge_document, merge_part, transition, DocumentStore, PartStore};
use crate::types::{Document, DocumentId, DocumentStatus, Part};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Both stores over process-local maps.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
    parts: RwLock<BTreeMap<(DocumentId, String), Part>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, document: &Document) -> Result<(), StorageError> {
        let mut documents = self.documents.write();
        if documents.contains_key(&document.id) {
            return Err(StorageError::DuplicateDocument(document.id));
        }
        documents.insert(document.id, document.clone());
        Ok(())
    }

    fn save(&self, document: &Document) -> Result<(), StorageError> {
        let mut documents = self.documents.write();
        let merged = merge_document(documents.get(&document.id).cloned(), document)?;
        documents.insert(document.id, merged);
        Ok(())
    }

    fn update_status(
        &self,
        id: &DocumentId,
        status: DocumentStatus,
    ) -> Result<Document, StorageError> {
        let mut documents = self.documents.write();
        let current = documents
            .get(id)
            .cloned()
            .ok_or(StorageError::DocumentNotFound(*id))?;
        let updated = transition(current, status)?;
        documents.insert(*id, updated.clone());
        Ok(updated)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StorageError> {
        Ok(self.documents.read().get(id).cloned())
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>, StorageError> {
        let mut owned: Vec<Document> = self
            .documents
            .read()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }
}

impl PartStore for MemoryStore {
    fn create(&self, part: &Part) -> Result<(), StorageError> {
        let mut parts = self.parts.write();
        let key = (part.document_id, part.key.clone());
        if parts.contains_key(&key) {
            return Err(StorageError::DuplicatePart {
                document_id: part.document_id,
                key: part.key.clone(),
            });
        }
        parts.insert(key, part.clone());
        Ok(())
    }

    fn save(&self, part: &Part) -> Result<Part, StorageError> {
        let mut parts = self.parts.write();
        let key = (part.document_id, part.key.clone());
        let merged = merge_part(parts.get(&key).cloned(), part);
        parts.insert(key, merged.clone());
        Ok(merged)
    }

    fn find_by_document(&self, document_id: &DocumentId) -> Result<Vec<Part>, StorageError> {
        Ok(self
            .parts
            .read()
            .range((*document_id, String::new())..)
            .take_while(|((doc, _), _)| doc == document_id)
            .map(|(_, part)| part.clone())
            .collect())
    }

    fn find_by_document_and_key(
        &self,
        document_id: &DocumentId,
        key: &str,
    ) -> Result<Option<Part>, StorageError> {
        Ok(self
            .parts
            .read()
            .get(&(*document_id, key.to_string()))
            .cloned())
    }
}
