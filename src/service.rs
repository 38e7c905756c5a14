//! Read-side document views and manual document creation.
//!
//! Every lookup is scoped to an owner; a document owned by someone else is
//! reported as not found.

use crate::error::ApiError;
use crate::generation::catalog::expected_part_count;
use crate::store::{DocumentStore, PartStore, Stores};
use crate::types::{Document, DocumentId, DocumentStatus, Part, PartId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Document with all its parts and a completion percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    pub document: Document,
    /// Stored parts over expected parts, 0-100
    pub progress: u8,
    pub parts: BTreeMap<String, Part>,
}

impl DocumentView {
    pub fn word_count(&self) -> usize {
        self.parts.values().map(Part::word_count).sum()
    }
}

/// Part metadata without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    pub id: PartId,
    pub key: String,
    pub title: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Part> for PartSummary {
    fn from(part: &Part) -> Self {
        Self {
            id: part.id,
            key: part.key.clone(),
            title: part.title.clone(),
            updated_at: part.updated_at,
        }
    }
}

pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    parts: Arc<dyn PartStore>,
}

impl DocumentService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            documents: stores.documents.clone(),
            parts: stores.parts.clone(),
        }
    }

    /// Create an empty document that is immediately ready.
    pub fn create_manual(&self, owner_id: &str, title: &str) -> Result<Document, ApiError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::InvalidRequest("Title is required".to_string()));
        }
        let document = Document::new(owner_id, title, None, None, DocumentStatus::Ready);
        self.documents.create(&document)?;
        Ok(document)
    }

    pub fn list(&self, owner_id: &str) -> Result<Vec<Document>, ApiError> {
        Ok(self.documents.list_by_owner(owner_id)?)
    }

    pub fn get(&self, owner_id: &str, id: &DocumentId) -> Result<Document, ApiError> {
        self.documents
            .get(id)?
            .filter(|doc| doc.owner_id == owner_id)
            .ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))
    }

    /// Part key to display title.
    pub fn outline(
        &self,
        owner_id: &str,
        id: &DocumentId,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let document = self.get(owner_id, id)?;
        Ok(self
            .parts
            .find_by_document(&document.id)?
            .into_iter()
            .map(|part| {
                let title = part.display_title().to_string();
                (part.key, title)
            })
            .collect())
    }

    pub fn full(&self, owner_id: &str, id: &DocumentId) -> Result<DocumentView, ApiError> {
        let document = self.get(owner_id, id)?;
        let parts: BTreeMap<String, Part> = self
            .parts
            .find_by_document(&document.id)?
            .into_iter()
            .map(|part| (part.key.clone(), part))
            .collect();
        Ok(DocumentView {
            progress: progress_percent(parts.len(), expected_part_count()),
            document,
            parts,
        })
    }

    /// Parts whose key equals `prefix` or starts with `prefix.`.
    pub fn parts_by_prefix(
        &self,
        owner_id: &str,
        id: &DocumentId,
        prefix: &str,
    ) -> Result<Vec<PartSummary>, ApiError> {
        let document = self.get(owner_id, id)?;
        let prefix = prefix.trim().trim_end_matches('.');
        let nested = format!("{}.", prefix);
        Ok(self
            .parts
            .find_by_document(&document.id)?
            .iter()
            .filter(|part| part.key == prefix || part.key.starts_with(&nested))
            .map(PartSummary::from)
            .collect())
    }

    pub fn part(&self, owner_id: &str, id: &DocumentId, key: &str) -> Result<Part, ApiError> {
        let document = self.get(owner_id, id)?;
        self.parts
            .find_by_document_and_key(&document.id, key)?
            .ok_or_else(|| ApiError::DocumentNotFound(format!("{} (part '{}')", id, key)))
    }
}

fn progress_percent(stored: usize, expected: usize) -> u8 {
    if expected == 0 {
        return 100;
    }
    let percent = ((stored as f64 / expected as f64) * 100.0).round();
    percent.min(100.0) as u8
}
