//! Fan-out orchestrator: title stage, objectives, concurrent section
//! generation and convergence for one document.
//!
//! `create_from_idea` persists the document and hands the body pipeline to a
//! background tokio task. Section tasks run concurrently through the shared
//! generation client; one task failing never stops the others.

use crate::context::ContextSupplier;
use crate::error::{ApiError, StorageError};
use crate::generation::catalog::{
    candidates_prompt, general_objective_prompt, keywords_prompt, selection_prompt,
    specific_objectives_prompt, SectionTask, TaskBindings, GENERAL_OBJECTIVE_KEY,
    GENERAL_OBJECTIVE_TITLE, SECTION_TASKS, SPECIFIC_OBJECTIVES_KEY, SPECIFIC_OBJECTIVES_TITLE,
};
use crate::generation::client::GenerationClient;
use crate::generation::convergence::{ConvergenceConfig, ConvergenceLoop, ConvergenceOutcome};
use crate::generation::title::{
    numbered_list, parse_keywords, parse_numbered_lines, TitleFilter, DEFAULT_MAX_KEYWORDS,
};
use crate::store::{DocumentStore, PartStore, Stores};
use crate::types::{Document, DocumentId, DocumentStatus, Part};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Title-stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Terms a title must not contain. A trailing `*` matches word prefixes.
    pub banned_title_terms: Vec<String>,
    pub max_keywords: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            banned_title_terms: vec!["methodolog*".to_string(), "apa".to_string()],
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }
}

/// Summary of one background pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub document_id: DocumentId,
    pub sections_generated: Vec<String>,
    pub section_failures: BTreeMap<String, String>,
    pub convergence: ConvergenceOutcome,
}

/// Result of the fan-out phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionOutcome {
    pub generated: Vec<String>,
    pub failures: BTreeMap<String, String>,
}

/// A persisted document and the handle of its background pipeline.
///
/// Dropping `handle` detaches the pipeline; it keeps running.
#[derive(Debug)]
pub struct StartedGeneration {
    pub document: Document,
    pub handle: JoinHandle<Result<GenerationReport, ApiError>>,
}

#[derive(Clone)]
pub struct DocumentGenerator {
    client: Arc<GenerationClient>,
    context: Arc<dyn ContextSupplier>,
    documents: Arc<dyn DocumentStore>,
    parts: Arc<dyn PartStore>,
    tasks: Arc<[SectionTask]>,
    title_filter: TitleFilter,
    max_keywords: usize,
    convergence: ConvergenceConfig,
}

impl DocumentGenerator {
    pub fn new(
        client: Arc<GenerationClient>,
        context: Arc<dyn ContextSupplier>,
        stores: &Stores,
        pipeline: &PipelineConfig,
        convergence: ConvergenceConfig,
    ) -> Self {
        Self {
            client,
            context,
            documents: stores.documents.clone(),
            parts: stores.parts.clone(),
            tasks: Arc::from(&SECTION_TASKS[..]),
            title_filter: TitleFilter::new(&pipeline.banned_title_terms),
            max_keywords: pipeline.max_keywords,
            convergence,
        }
    }

    /// Replace the section catalog dispatched by the fan-out phase.
    pub fn with_tasks(mut self, tasks: Vec<SectionTask>) -> Self {
        self.tasks = Arc::from(tasks);
        self
    }

    /// Select a title, persist the document and start the body pipeline.
    pub async fn create_from_idea(
        &self,
        owner_id: &str,
        idea: &str,
        discipline: Option<&str>,
    ) -> Result<StartedGeneration, ApiError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(ApiError::InvalidRequest("Idea cannot be empty".to_string()));
        }
        let discipline = discipline.map(str::trim).filter(|d| !d.is_empty());

        let contexts = self.context.load_context();
        let title = self.select_title(&contexts, idea, discipline).await?;

        let document = Document::new(
            owner_id,
            title,
            Some(idea.to_string()),
            discipline.map(str::to_string),
            DocumentStatus::Generating,
        );
        self.documents.create(&document)?;
        info!(
            document_id = %document.id,
            owner_id,
            title = %document.title,
            "Document created, starting background generation"
        );

        let generator = self.clone();
        let background = document.clone();
        let handle = tokio::spawn(async move { generator.run_guarded(&background).await });

        Ok(StartedGeneration { document, handle })
    }

    async fn select_title(
        &self,
        contexts: &[String],
        idea: &str,
        discipline: Option<&str>,
    ) -> Result<String, ApiError> {
        let raw_keywords = self
            .client
            .generate_with_context(contexts, &keywords_prompt(idea, discipline))
            .await?;
        let keywords = parse_keywords(&raw_keywords, self.max_keywords);
        debug!(keywords = ?keywords, "Keywords extracted");

        let raw_candidates = self
            .client
            .generate_with_context(contexts, &candidates_prompt(idea, discipline, &keywords))
            .await?;
        let candidates = parse_numbered_lines(&raw_candidates);
        if candidates.is_empty() {
            warn!("No title candidates parsed, using the idea as title");
            return Ok(idea.to_string());
        }

        let shortlist = self.title_filter.shortlist(&candidates, &keywords);
        debug!(
            candidates = candidates.len(),
            shortlisted = shortlist.len(),
            "Title candidates filtered"
        );
        let reply = self
            .client
            .generate_with_context(contexts, &selection_prompt(&shortlist))
            .await?;

        Ok(self
            .title_filter
            .resolve_selection(&reply, &shortlist)
            .unwrap_or_else(|| idea.to_string()))
    }

    /// Run objectives, fan-out and convergence, then mark the document ready.
    ///
    /// Any error escaping the phases marks the document failed and is returned.
    pub async fn generate_all_sections(
        &self,
        document: &Document,
    ) -> Result<GenerationReport, ApiError> {
        match self.run_pipeline(document).await {
            Ok(report) => {
                info!(
                    document_id = %document.id,
                    generated = report.sections_generated.len(),
                    failed = report.section_failures.len(),
                    words = report.convergence.final_words,
                    "Document ready"
                );
                Ok(report)
            }
            Err(err) => {
                error!(document_id = %document.id, error = %err, "Background generation failed");
                if let Err(status_err) = self
                    .documents
                    .update_status(&document.id, DocumentStatus::Failed)
                {
                    error!(
                        document_id = %document.id,
                        error = %status_err,
                        "Failed to mark document as failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// `generate_all_sections`, with a panic converted into a failed document.
    async fn run_guarded(&self, document: &Document) -> Result<GenerationReport, ApiError> {
        match AssertUnwindSafe(self.generate_all_sections(document))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(document_id = %document.id, panic = %message, "Background generation panicked");
                if let Err(status_err) = self
                    .documents
                    .update_status(&document.id, DocumentStatus::Failed)
                {
                    error!(
                        document_id = %document.id,
                        error = %status_err,
                        "Failed to mark document as failed"
                    );
                }
                Err(ApiError::GenerationFailed(format!(
                    "Background pipeline panicked: {}",
                    message
                )))
            }
        }
    }

    async fn run_pipeline(&self, document: &Document) -> Result<GenerationReport, ApiError> {
        let contexts = self.context.load_context();
        let bindings = self.resolve_objectives(document, &contexts).await?;

        let sections = self.run_section_tasks(document, &contexts, &bindings).await;

        let convergence = self
            .ensure_min_word_count(
                document,
                self.convergence.target_words,
                self.convergence.max_rounds,
            )
            .await?;

        self.documents
            .update_status(&document.id, DocumentStatus::Ready)?;

        Ok(GenerationReport {
            document_id: document.id,
            sections_generated: sections.generated,
            section_failures: sections.failures,
            convergence,
        })
    }

    /// Phase 1: general and specific objectives, generated and stored in order.
    async fn resolve_objectives(
        &self,
        document: &Document,
        contexts: &[String],
    ) -> Result<TaskBindings, ApiError> {
        let discipline = document.discipline.as_deref();

        let general_raw = self
            .client
            .generate_with_context(contexts, &general_objective_prompt(&document.title, discipline))
            .await?;
        let general_objective = collapse_to_line(&general_raw);

        let specific_raw = self
            .client
            .generate_with_context(
                contexts,
                &specific_objectives_prompt(&document.title, discipline),
            )
            .await?;
        let mut specific_objectives = parse_numbered_lines(&specific_raw);
        if specific_objectives.is_empty() {
            let fallback = collapse_to_line(&specific_raw);
            specific_objectives.push(if fallback.is_empty() {
                "—".to_string()
            } else {
                fallback
            });
        }

        self.upsert_part(
            document.id,
            GENERAL_OBJECTIVE_KEY,
            GENERAL_OBJECTIVE_TITLE,
            general_objective.clone(),
        )?;
        self.upsert_part(
            document.id,
            SPECIFIC_OBJECTIVES_KEY,
            SPECIFIC_OBJECTIVES_TITLE,
            numbered_list(&specific_objectives),
        )?;
        info!(
            document_id = %document.id,
            specific = specific_objectives.len(),
            "Objectives stored"
        );

        Ok(TaskBindings {
            topic: document.title.clone(),
            discipline: document.discipline.clone(),
            general_objective,
            specific_objectives,
        })
    }

    /// Phase 2: dispatch every section task and wait for all of them to settle.
    pub async fn run_section_tasks(
        &self,
        document: &Document,
        contexts: &[String],
        bindings: &TaskBindings,
    ) -> SectionOutcome {
        info!(
            document_id = %document.id,
            tasks = self.tasks.len(),
            "Dispatching section tasks"
        );

        let mut futures = FuturesUnordered::new();
        for task in self.tasks.iter() {
            futures.push(async move {
                let result = AssertUnwindSafe(self.run_task(document.id, task, contexts, bindings))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(ApiError::GenerationFailed(format!(
                            "Section task panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                (task, result)
            });
        }

        let mut outcome = SectionOutcome::default();
        while let Some((task, result)) = futures.next().await {
            match result {
                Ok(part) => {
                    debug!(
                        document_id = %document.id,
                        key = task.key,
                        words = part.word_count(),
                        "Section stored"
                    );
                    outcome.generated.push(task.key.to_string());
                }
                Err(err) => {
                    warn!(
                        document_id = %document.id,
                        key = task.key,
                        error = %err,
                        "Section generation failed"
                    );
                    outcome.failures.insert(task.key.to_string(), err.to_string());
                }
            }
        }

        info!(
            document_id = %document.id,
            generated = outcome.generated.len(),
            failed = outcome.failures.len(),
            "Section tasks settled"
        );
        outcome
    }

    async fn run_task(
        &self,
        document_id: DocumentId,
        task: &SectionTask,
        contexts: &[String],
        bindings: &TaskBindings,
    ) -> Result<Part, ApiError> {
        let prompt = task.prompt(bindings);
        let content = self.client.generate_with_context(contexts, &prompt).await?;
        Ok(self.upsert_part(document_id, task.key, task.title, content)?)
    }

    fn upsert_part(
        &self,
        document_id: DocumentId,
        key: &str,
        title: &str,
        content: String,
    ) -> Result<Part, StorageError> {
        let part = Part::new(document_id, key, Some(title.to_string()), content);
        match self.parts.find_by_document_and_key(&document_id, key)? {
            Some(_) => self.parts.save(&part),
            None => match self.parts.create(&part) {
                Ok(()) => Ok(part),
                Err(StorageError::DuplicatePart { .. }) => self.parts.save(&part),
                Err(e) => Err(e),
            },
        }
    }

    /// Phase 3: expand priority sections until `target_words` or `max_rounds`.
    pub async fn ensure_min_word_count(
        &self,
        document: &Document,
        target_words: usize,
        max_rounds: usize,
    ) -> Result<ConvergenceOutcome, ApiError> {
        let contexts = self.context.load_context();
        let convergence = ConvergenceLoop::new(&self.client, self.parts.as_ref(), &self.convergence);
        Ok(convergence
            .run(document, &contexts, target_words, max_rounds)
            .await?)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn collapse_to_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
