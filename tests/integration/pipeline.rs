//! Fan-out orchestrator and convergence loop against a scripted provider.

use crate::integration::support::{
    generator, no_convergence, pipeline_reply, words, ScriptedProvider, BACKGROUND_MARKER,
    CANDIDATES_MARKER, EXPANSION_MARKER, GENERAL_OBJECTIVE_MARKER, KEYWORDS_MARKER,
    SELECTION_MARKER,
};
use draftsmith::error::{ApiError, ProviderError, StorageError};
use draftsmith::generation::catalog::{expected_part_count, SPECIFIC_OBJECTIVES_KEY};
use draftsmith::generation::title::TitleFilter;
use draftsmith::generation::{
    ConvergenceConfig, PipelineConfig, SectionTask, TaskBindings, SECTION_TASKS,
};
use draftsmith::provider::classify::classify_response;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use draftsmith::store::{DocumentStore, MemoryStore, PartStore, Stores};
use draftsmith::types::{Document, DocumentId, DocumentStatus, Part};
use std::sync::Arc;
use std::time::Duration;

fn generating_document(stores: &Stores, title: &str) -> Document {
    let document = Document::new(
        "alice",
        title,
        Some("A study on adaptive learning".to_string()),
        Some("Education".to_string()),
        DocumentStatus::Generating,
    );
    stores.documents.create(&document).unwrap();
    document
}

fn bindings() -> TaskBindings {
    TaskBindings {
        topic: "Adaptive learning".to_string(),
        discipline: Some("Education".to_string()),
        general_objective: "To assess adaptive learning".to_string(),
        specific_objectives: vec!["To describe".to_string(), "To compare".to_string()],
    }
}

#[tokio::test]
async fn one_failing_section_never_aborts_siblings() {
    assert_eq!(SECTION_TASKS.len(), 35);
    let failing_prompt = SECTION_TASKS[16].prompt(&bindings());
    let provider = Arc::new(ScriptedProvider::new(move |input, _| {
        if input == failing_prompt {
            Err(ProviderError::fatal("model refused"))
        } else {
            Ok(words(20))
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, no_convergence());
    let document = generating_document(&stores, "Adaptive learning");

    let outcome = generator
        .run_section_tasks(&document, &[], &bindings())
        .await;

    assert_eq!(outcome.generated.len(), 34);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures.contains_key("theoretical.background"));
    assert_eq!(provider.call_count(), 35);
    assert_eq!(stores.parts.find_by_document(&document.id).unwrap().len(), 34);
}

#[tokio::test]
async fn pipeline_with_failed_section_still_becomes_ready() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains(BACKGROUND_MARKER) {
            Err(ProviderError::transient("quota exhausted"))
        } else {
            pipeline_reply(input, 50)
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider, &stores, no_convergence());
    let document = generating_document(&stores, "Adaptive learning");

    let report = generator.generate_all_sections(&document).await.unwrap();

    assert_eq!(report.sections_generated.len(), 34);
    assert_eq!(
        report.section_failures.keys().collect::<Vec<_>>(),
        vec!["theoretical.background"]
    );
    let parts = stores.parts.find_by_document(&document.id).unwrap();
    assert_eq!(parts.len(), 34 + 2);
    assert!(parts.iter().all(|p| p.key != "theoretical.background"));
    let stored = stores.documents.get(&document.id).unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Ready);
}

#[tokio::test]
async fn create_from_idea_returns_before_body_generation() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| pipeline_reply(input, 30)));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "A study on adaptive learning", Some("Education"))
        .await
        .unwrap();

    let document = &started.document;
    assert_eq!(document.status, DocumentStatus::Generating);
    assert_eq!(
        document.title,
        "Adaptive Learning Platforms and Student Achievement in Rural Schools"
    );
    assert!(!TitleFilter::new(&PipelineConfig::default().banned_title_terms)
        .contains_banned(&document.title));
    assert!(!started.handle.is_finished());
    assert_eq!(provider.call_count(), 3);
    assert_eq!(
        stores.documents.get(&document.id).unwrap().unwrap().status,
        DocumentStatus::Generating
    );

    let report = started.handle.await.unwrap().unwrap();
    assert!(report.section_failures.is_empty());
    assert_eq!(
        stores.parts.find_by_document(&document.id).unwrap().len(),
        expected_part_count()
    );
    assert_eq!(
        stores.documents.get(&document.id).unwrap().unwrap().status,
        DocumentStatus::Ready
    );
    let specific = stores
        .parts
        .find_by_document_and_key(&document.id, SPECIFIC_OBJECTIVES_KEY)
        .unwrap()
        .unwrap();
    assert_eq!(
        specific.content,
        "1. To describe current practice\n2. To compare outcomes\n3. To propose improvements"
    );
}

#[tokio::test]
async fn all_banned_candidates_fall_back_to_unfiltered_list() {
    let candidates = [
        "Methodology of Adaptive Learning",
        "APA Guide to Adaptive Learning",
        "Methodological Notes on Learning",
        "Adaptive Learning: An APA Review",
        "Methodologies for Rural Education",
    ];
    let listed = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    let provider = Arc::new(ScriptedProvider::new(move |input, _| {
        if input.contains(CANDIDATES_MARKER) {
            Ok(listed.clone())
        } else if input.contains(SELECTION_MARKER) {
            Ok("\"APA Guide to Adaptive Learning\"".to_string())
        } else {
            pipeline_reply(input, 10)
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap();

    assert_eq!(started.document.title, "APA Guide to Adaptive Learning");
    let selection = provider
        .calls()
        .into_iter()
        .find(|c| c.input.contains(SELECTION_MARKER))
        .unwrap();
    for candidate in candidates {
        assert!(selection.input.contains(candidate));
    }
    started.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn banned_selection_is_replaced_by_clean_candidate() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains(SELECTION_MARKER) {
            Ok("APA Style for Education Theses".to_string())
        } else {
            pipeline_reply(input, 10)
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider, &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", Some("Education"))
        .await
        .unwrap();

    assert_eq!(
        started.document.title,
        "Adaptive Learning Platforms and Student Achievement in Rural Schools"
    );
    started.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn empty_idea_is_rejected_without_provider_calls() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| pipeline_reply(input, 10)));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, no_convergence());

    let err = generator.create_from_idea("owner-1", "   ", None).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(provider.call_count(), 0);
    assert!(stores.documents.list_by_owner("owner-1").unwrap().is_empty());
}

#[tokio::test]
async fn fatal_title_stage_error_creates_no_document() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains(KEYWORDS_MARKER) {
            Err(ProviderError::fatal("API key not valid"))
        } else {
            pipeline_reply(input, 10)
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider, &stores, no_convergence());

    let err = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Provider(ProviderError::Fatal(_))));
    assert!(stores.documents.list_by_owner("owner-1").unwrap().is_empty());
}

#[tokio::test]
async fn oversized_retry_hint_fails_only_its_section() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains(BACKGROUND_MARKER) {
            let mut headers = HeaderMap::new();
            headers.insert(
                RETRY_AFTER,
                HeaderValue::from_static("99999999999999999999999"),
            );
            Err(classify_response(StatusCode::TOO_MANY_REQUESTS, &headers, ""))
        } else {
            pipeline_reply(input, 30)
        }
    }));
    let stores = Stores::memory();
    let generator = generator(provider, &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap();
    let report = started.handle.await.unwrap().unwrap();

    assert_eq!(
        report.section_failures.keys().collect::<Vec<_>>(),
        vec!["theoretical.background"]
    );
    assert_eq!(
        stores.parts.find_by_document(&started.document.id).unwrap().len(),
        expected_part_count() - 1
    );
    assert_eq!(
        stores.documents.get(&started.document.id).unwrap().unwrap().status,
        DocumentStatus::Ready
    );
}

fn summary_prompt(bindings: &TaskBindings) -> String {
    format!("Summarize {}", bindings.topic)
}

fn broken_prompt(_: &TaskBindings) -> String {
    panic!("template missing")
}

#[tokio::test]
async fn panicking_section_is_isolated_in_custom_catalog() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| pipeline_reply(input, 30)));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, no_convergence()).with_tasks(vec![
        SectionTask::new("summary", "Summary", summary_prompt),
        SectionTask::new("broken", "Broken", broken_prompt),
        SECTION_TASKS[0],
    ]);

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap();
    let report = started.handle.await.unwrap().unwrap();

    let mut generated = report.sections_generated.clone();
    generated.sort();
    let mut expected = vec!["summary".to_string(), SECTION_TASKS[0].key.to_string()];
    expected.sort();
    assert_eq!(generated, expected);
    assert!(report.section_failures["broken"].contains("template missing"));
    // Title stage, both objectives and the two sections that built a prompt.
    assert_eq!(provider.call_count(), 7);
    assert_eq!(
        stores.parts.find_by_document(&started.document.id).unwrap().len(),
        2 + 2
    );
    assert_eq!(
        stores.documents.get(&started.document.id).unwrap().unwrap().status,
        DocumentStatus::Ready
    );
}

#[tokio::test]
async fn panic_outside_sections_marks_document_failed() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains(GENERAL_OBJECTIVE_MARKER) {
            panic!("provider crashed");
        }
        pipeline_reply(input, 10)
    }));
    let stores = Stores::memory();
    let generator = generator(provider, &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap();
    let err = started.handle.await.unwrap().unwrap_err();

    match err {
        ApiError::GenerationFailed(message) => assert!(message.contains("provider crashed")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        stores.documents.get(&started.document.id).unwrap().unwrap().status,
        DocumentStatus::Failed
    );
}

/// Part store that rejects every write, standing in for a storage outage.
struct UnavailableParts {
    inner: MemoryStore,
}

impl PartStore for UnavailableParts {
    fn create(&self, _part: &Part) -> Result<(), StorageError> {
        Err(StorageError::Backend("connection refused".to_string()))
    }

    fn save(&self, _part: &Part) -> Result<Part, StorageError> {
        Err(StorageError::Backend("connection refused".to_string()))
    }

    fn find_by_document(&self, document_id: &DocumentId) -> Result<Vec<Part>, StorageError> {
        PartStore::find_by_document(&self.inner, document_id)
    }

    fn find_by_document_and_key(
        &self,
        document_id: &DocumentId,
        key: &str,
    ) -> Result<Option<Part>, StorageError> {
        PartStore::find_by_document_and_key(&self.inner, document_id, key)
    }
}

#[tokio::test]
async fn storage_outage_marks_document_failed() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| pipeline_reply(input, 10)));
    let documents = Arc::new(MemoryStore::new());
    let stores = Stores {
        documents: documents.clone(),
        parts: Arc::new(UnavailableParts {
            inner: MemoryStore::new(),
        }),
    };
    let generator = generator(provider.clone(), &stores, no_convergence());

    let started = generator
        .create_from_idea("owner-1", "Adaptive learning", None)
        .await
        .unwrap();
    let err = started.handle.await.unwrap().unwrap_err();

    assert!(matches!(err, ApiError::StorageError(StorageError::Backend(_))));
    let stored = DocumentStore::get(documents.as_ref(), &started.document.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, DocumentStatus::Failed);
    // Title stage plus both objective calls; no section was dispatched.
    assert_eq!(provider.call_count(), 5);
}

fn convergence_config(keys: &[&str]) -> ConvergenceConfig {
    ConvergenceConfig {
        target_words: 0,
        max_rounds: 0,
        words_per_expansion: 5,
        anchor_chars: 20,
        priority_keys: keys.iter().map(|k| k.to_string()).collect(),
    }
}

fn seed_parts(stores: &Stores, document: &Document, keys: &[&str], words_each: usize) {
    for key in keys {
        stores
            .parts
            .create(&Part::new(document.id, *key, None, words(words_each)))
            .unwrap();
    }
}

#[tokio::test]
async fn convergence_is_bounded_by_rounds_times_keys() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| Ok(words(5))));
    let stores = Stores::memory();
    let keys = ["results", "discussion", "conclusions"];
    let generator = generator(
        provider.clone(),
        &stores,
        convergence_config(&["results", "discussion", "conclusions", "methodology"]),
    );
    let document = generating_document(&stores, "Adaptive learning");
    seed_parts(&stores, &document, &keys, 10);

    let outcome = generator
        .ensure_min_word_count(&document, 1_000, 2)
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 2 * 3);
    assert_eq!(outcome.initial_words, 30);
    assert_eq!(outcome.final_words, 60);
    assert_eq!(outcome.rounds_run, 2);
    assert!(!outcome.target_reached);
    let stored = stores
        .parts
        .find_by_document_and_key(&document.id, "results")
        .unwrap()
        .unwrap();
    assert_eq!(stored.word_count(), 20);
}

#[tokio::test]
async fn convergence_stops_once_target_is_reached() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| Ok(words(5))));
    let stores = Stores::memory();
    let keys = ["results", "discussion", "conclusions"];
    let generator = generator(provider.clone(), &stores, convergence_config(&keys));
    let document = generating_document(&stores, "Adaptive learning");
    seed_parts(&stores, &document, &keys, 10);

    let outcome = generator.ensure_min_word_count(&document, 42, 5).await.unwrap();

    assert_eq!(provider.call_count(), 3);
    assert_eq!(outcome.final_words, 45);
    assert!(outcome.target_reached);
    assert_eq!(outcome.rounds_run, 1);
}

#[tokio::test]
async fn convergence_at_target_makes_no_calls() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| Ok(words(5))));
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, convergence_config(&["results"]));
    let document = generating_document(&stores, "Adaptive learning");
    seed_parts(&stores, &document, &["results"], 50);

    let outcome = generator.ensure_min_word_count(&document, 50, 3).await.unwrap();

    assert_eq!(provider.call_count(), 0);
    assert!(outcome.target_reached);
    assert_eq!(outcome.rounds_run, 0);
}

#[tokio::test]
async fn failed_expansion_is_skipped() {
    let provider = Arc::new(ScriptedProvider::new(|input, _| {
        if input.contains("\"discussion\"") {
            Err(ProviderError::fatal("blocked"))
        } else {
            Ok(words(5))
        }
    }));
    let stores = Stores::memory();
    let keys = ["results", "discussion"];
    let generator = generator(provider.clone(), &stores, convergence_config(&keys));
    let document = generating_document(&stores, "Adaptive learning");
    seed_parts(&stores, &document, &keys, 10);

    let outcome = generator.ensure_min_word_count(&document, 100, 2).await.unwrap();

    assert_eq!(provider.count_matching(EXPANSION_MARKER), 4);
    assert_eq!(outcome.successful_expansions, 2);
    assert_eq!(outcome.failed_expansions, 2);
    assert_eq!(outcome.final_words, 30);
    let discussion = stores
        .parts
        .find_by_document_and_key(&document.id, "discussion")
        .unwrap()
        .unwrap();
    assert_eq!(discussion.word_count(), 10);
}

#[tokio::test(start_paused = true)]
async fn expansion_appends_after_anchor() {
    let provider = Arc::new(
        ScriptedProvider::new(|_, _| Ok("fresh text".to_string()))
            .with_latency(Duration::from_millis(5)),
    );
    let stores = Stores::memory();
    let generator = generator(provider.clone(), &stores, convergence_config(&["results"]));
    let document = generating_document(&stores, "Adaptive learning");
    stores
        .parts
        .create(&Part::new(document.id, "results", None, "the opening paragraph ends here"))
        .unwrap();

    generator.ensure_min_word_count(&document, 8, 1).await.unwrap();

    let input = &provider.calls()[0].input;
    assert!(input.ends_with("paragraph ends here"));
    let stored = stores
        .parts
        .find_by_document_and_key(&document.id, "results")
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "the opening paragraph ends here\n\nfresh text");
}
