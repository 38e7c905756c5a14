//! Store contract checks against the sled backend through `Stores::open`.

use draftsmith::error::StorageError;
use draftsmith::store::{StorageBackend, StorageConfig, Stores};
use draftsmith::types::{Document, DocumentStatus, Part};
use tempfile::TempDir;

/// Relative path, resolved against the workspace root passed to `Stores::open`.
fn sled_config() -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Sled,
        path: Some("store".into()),
    }
}

#[test]
fn documents_and_parts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = sled_config();
    let document = Document::new("alice", "Adaptive learning", None, None, DocumentStatus::Generating);

    {
        let stores = Stores::open(&config, dir.path()).unwrap();
        stores.documents.create(&document).unwrap();
        stores
            .parts
            .create(&Part::new(document.id, "results", Some("Results".into()), "a b c"))
            .unwrap();
        stores
            .documents
            .update_status(&document.id, DocumentStatus::Ready)
            .unwrap();
    }

    let stores = Stores::open(&config, dir.path()).unwrap();
    let stored = stores.documents.get(&document.id).unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Ready);
    let parts = stores.parts.find_by_document(&document.id).unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].content, "a b c");
}

#[test]
fn terminal_status_cannot_change() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&sled_config(), dir.path()).unwrap();
    let document = Document::new("alice", "T", None, None, DocumentStatus::Generating);
    stores.documents.create(&document).unwrap();

    stores
        .documents
        .update_status(&document.id, DocumentStatus::Failed)
        .unwrap();
    let err = stores
        .documents
        .update_status(&document.id, DocumentStatus::Ready)
        .unwrap_err();

    assert!(matches!(err, StorageError::InvalidStatusTransition { .. }));
}

#[test]
fn one_part_per_document_and_key() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&sled_config(), dir.path()).unwrap();
    let document = Document::new("alice", "T", None, None, DocumentStatus::Generating);
    stores.documents.create(&document).unwrap();

    let first = Part::new(document.id, "discussion", None, "first");
    stores.parts.create(&first).unwrap();
    let err = stores
        .parts
        .create(&Part::new(document.id, "discussion", None, "second"))
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicatePart { .. }));

    let saved = stores
        .parts
        .save(&Part::new(document.id, "discussion", None, "replaced"))
        .unwrap();
    assert_eq!(saved.id, first.id);
    assert_eq!(saved.content, "replaced");
    assert_eq!(stores.parts.find_by_document(&document.id).unwrap().len(), 1);
}

#[test]
fn memory_backend_ignores_path() {
    let config = StorageConfig {
        backend: StorageBackend::Memory,
        path: Some("/nonexistent/never/created".into()),
    };
    let stores = Stores::open(&config, std::path::Path::new(".")).unwrap();
    assert!(stores.documents.list_by_owner("anyone").unwrap().is_empty());
}

#[test]
fn save_cannot_leave_terminal_status() {
    let dir = TempDir::new().unwrap();
    let sled = Stores::open(&sled_config(), dir.path()).unwrap();
    for stores in [sled, Stores::memory()] {
        let document = Document::new("alice", "T", None, None, DocumentStatus::Generating);
        stores.documents.create(&document).unwrap();

        let mut renamed = document.clone();
        renamed.title = "Renamed".to_string();
        renamed.status = DocumentStatus::Ready;
        stores.documents.save(&renamed).unwrap();
        let stored = stores.documents.get(&document.id).unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.status, DocumentStatus::Ready);
        assert_eq!(stored.created_at, document.created_at);

        let mut reopened = renamed.clone();
        reopened.status = DocumentStatus::Generating;
        let err = stores.documents.save(&reopened).unwrap_err();
        assert!(matches!(err, StorageError::InvalidStatusTransition { .. }));
        assert_eq!(
            stores.documents.get(&document.id).unwrap().unwrap().status,
            DocumentStatus::Ready
        );
    }
}

#[test]
fn concurrent_create_and_save_keep_created_identity() {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&sled_config(), dir.path()).unwrap();
    let document = Document::new("alice", "T", None, None, DocumentStatus::Generating);
    stores.documents.create(&document).unwrap();

    for i in 0..200 {
        let key = format!("section.{}", i);
        let created = Part::new(document.id, key.as_str(), None, "created");
        let saved = Part::new(document.id, key.as_str(), None, "saved");

        let create_result = std::thread::scope(|scope| {
            let creator = scope.spawn(|| stores.parts.create(&created));
            let saver = scope.spawn(|| stores.parts.save(&saved));
            saver.join().unwrap().unwrap();
            creator.join().unwrap()
        });

        let stored = stores
            .parts
            .find_by_document_and_key(&document.id, &key)
            .unwrap()
            .unwrap();
        match create_result {
            Ok(()) => {
                assert_eq!(stored.id, created.id);
                assert_eq!(stored.created_at, created.created_at);
            }
            Err(err) => {
                assert!(matches!(err, StorageError::DuplicatePart { .. }));
                assert_eq!(stored.id, saved.id);
            }
        }
    }
}
