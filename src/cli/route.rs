//! CLI route: single route table and run context. Dispatches to the generator,
//! the document service and presentation.

use crate::cli::output::to_json;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_document_list, format_document_view, format_generation_report, format_outline,
    format_part, format_part_summaries,
};
use crate::config::{ConfigLoader, DraftsmithConfig};
use crate::context::{ContextSupplier, PromptContextLoader, StaticContext};
use crate::error::ApiError;
use crate::generation::{DocumentGenerator, GenerationClient};
use crate::provider::create_client;
use crate::service::DocumentService;
use crate::store::Stores;
use crate::types::DocumentId;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: resolved configuration, stores and services.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: DraftsmithConfig,
    workspace_root: PathBuf,
    stores: Stores,
    service: DocumentService,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref cfg_path) => ConfigLoader::load_from_file(cfg_path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;
        Self::with_config(workspace_root, config)
    }

    /// Create run context from an already resolved configuration.
    pub fn with_config(workspace_root: PathBuf, config: DraftsmithConfig) -> Result<Self, ApiError> {
        let workspace_root = config
            .workspace_root
            .clone()
            .unwrap_or(workspace_root);
        let stores = Stores::open(&config.storage, &workspace_root)?;
        let service = DocumentService::new(&stores);
        Ok(Self {
            config,
            workspace_root,
            stores,
            service,
        })
    }

    pub fn config(&self) -> &DraftsmithConfig {
        &self.config
    }

    pub fn service(&self) -> &DocumentService {
        &self.service
    }

    /// Build the generator. Only `generate` needs provider credentials.
    pub fn generator(&self) -> Result<DocumentGenerator, ApiError> {
        let provider = create_client(&self.config.provider)?;
        let client = Arc::new(GenerationClient::new(provider, &self.config.client));
        Ok(DocumentGenerator::new(
            client,
            context_supplier(&self.workspace_root, &self.config),
            &self.stores,
            &self.config.pipeline,
            self.config.convergence.clone(),
        ))
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command).await;
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                idea,
                discipline,
                owner,
            } => self.handle_generate(owner, idea, discipline.as_deref()).await,
            Commands::List { owner, format } => {
                let documents = self.service.list(owner)?;
                match format.as_str() {
                    "json" => to_json(&documents),
                    _ => Ok(format_document_list(&documents)),
                }
            }
            Commands::Show {
                id,
                owner,
                full,
                prefix,
                part,
                format,
            } => self.handle_show(
                owner,
                id,
                ShowView::select(*full, prefix.as_deref(), part.as_deref()),
                format,
            ),
            Commands::Create { title, owner } => {
                let document = self.service.create_manual(owner, title)?;
                Ok(format!("Created {} \"{}\"", document.id, document.title))
            }
            Commands::Config => self.config.to_redacted_toml(),
        }
    }

    async fn handle_generate(
        &self,
        owner: &str,
        idea: &str,
        discipline: Option<&str>,
    ) -> Result<String, ApiError> {
        let generator = self.generator()?;
        let started = generator.create_from_idea(owner, idea, discipline).await?;
        let header = format!("Title: {}\nId: {}", started.document.title, started.document.id);
        // Title and id are known before the body exists; show them right away.
        println!("{}", header);
        info!(document_id = %started.document.id, "Waiting for background pipeline");

        let report = started
            .handle
            .await
            .map_err(|e| ApiError::GenerationFailed(format!("Pipeline task aborted: {}", e)))??;
        Ok(format_generation_report(&report))
    }

    fn handle_show(
        &self,
        owner: &str,
        id: &str,
        view: ShowView<'_>,
        format: &str,
    ) -> Result<String, ApiError> {
        let id: DocumentId = id
            .parse()
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid document id '{}': {}", id, e)))?;
        let json = format == "json";

        match view {
            ShowView::Part(key) => {
                let part = self.service.part(owner, &id, key)?;
                if json {
                    to_json(&part)
                } else {
                    Ok(format_part(&part))
                }
            }
            ShowView::Prefix(prefix) => {
                let parts = self.service.parts_by_prefix(owner, &id, prefix)?;
                if json {
                    to_json(&parts)
                } else {
                    Ok(format_part_summaries(prefix, &parts))
                }
            }
            ShowView::Full => {
                let view = self.service.full(owner, &id)?;
                if json {
                    to_json(&view)
                } else {
                    Ok(format_document_view(&view))
                }
            }
            ShowView::Outline => {
                let document = self.service.get(owner, &id)?;
                let outline = self.service.outline(owner, &id)?;
                if json {
                    to_json(&json!({ "document": document, "outline": outline }))
                } else {
                    Ok(format_outline(&document, &outline))
                }
            }
        }
    }
}

/// Which slice of a document `show` renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowView<'a> {
    Outline,
    Full,
    Prefix(&'a str),
    Part(&'a str),
}

impl<'a> ShowView<'a> {
    fn select(full: bool, prefix: Option<&'a str>, part: Option<&'a str>) -> Self {
        match (part, prefix) {
            (Some(key), _) => ShowView::Part(key),
            (None, Some(prefix)) => ShowView::Prefix(prefix),
            (None, None) if full => ShowView::Full,
            (None, None) => ShowView::Outline,
        }
    }
}

fn context_supplier(workspace_root: &Path, config: &DraftsmithConfig) -> Arc<dyn ContextSupplier> {
    if config.context.enabled {
        Arc::new(PromptContextLoader::new(workspace_root, &config.context))
    } else {
        Arc::new(StaticContext::empty())
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::List { .. } => "list",
        Commands::Show { .. } => "show",
        Commands::Create { .. } => "create",
        Commands::Config => "config",
    }
}
