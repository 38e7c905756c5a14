//! Configuration System
//!
//! Layered configuration for the generation pipeline: built-in defaults, the
//! user's global file, the workspace files and `DRAFTSMITH_*` environment
//! overrides, in that order of increasing precedence.

use crate::context::ContextConfig;
use crate::error::ApiError;
use crate::generation::{ClientConfig, ConvergenceConfig, PipelineConfig};
use crate::logging::LoggingConfig;
use crate::store::StorageConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftsmithConfig {
    /// Workspace root path (defaults to current directory)
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub provider: ProviderConfig,

    /// Gate, retry, timeout and context budget of the generation client
    #[serde(default)]
    pub client: ClientConfig,

    /// Title stage settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub convergence: ConvergenceConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Client(String),
    Pipeline(String),
    Convergence(String),
    Context(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Client(msg) => write!(f, "Client: {}", msg),
            ValidationError::Pipeline(msg) => write!(f, "Pipeline: {}", msg),
            ValidationError::Convergence(msg) => write!(f, "Convergence: {}", msg),
            ValidationError::Context(msg) => write!(f, "Context: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DraftsmithConfig {
    /// Validate the entire configuration, collecting every error
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.client.validate() {
            errors.push(ValidationError::Client(e));
        }
        if self.pipeline.max_keywords == 0 {
            errors.push(ValidationError::Pipeline(
                "max_keywords must be at least 1".to_string(),
            ));
        }
        if self.convergence.words_per_expansion == 0 {
            errors.push(ValidationError::Convergence(
                "words_per_expansion must be at least 1".to_string(),
            ));
        }
        if self.convergence.anchor_chars == 0 {
            errors.push(ValidationError::Convergence(
                "anchor_chars must be at least 1".to_string(),
            ));
        }
        if self.context.enabled && self.context.extensions.is_empty() {
            errors.push(ValidationError::Context(
                "at least one file extension is required when context is enabled".to_string(),
            ));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into one `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Render as TOML with the inline API key redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ApiError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))
    }
}
