//! Model Provider Abstraction
//!
//! A single-call completion interface over hosted LLM APIs. Adapters translate
//! their transport and HTTP failures into [`ProviderError`] so that retry and
//! pacing stay provider-agnostic in the generation client.

use crate::error::{ApiError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod classify;
pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

/// Completion provider boundary.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a single prompt and return the raw generated text.
    async fn complete(&self, input: &str) -> Result<String, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAI,
}

impl ProviderType {
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            ProviderType::Gemini => "GEMINI_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.5-flash",
            ProviderType::OpenAI => "gpt-4o-mini",
        }
    }
}

/// Provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    /// Model name; empty selects the provider type's default model.
    pub model: String,
    /// Inline API key; prefer `api_key_env` outside of local experiments.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Custom endpoint (proxies, Azure OpenAI, local OpenAI-compatible servers).
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Gemini,
            model: String::new(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            temperature: None,
            max_output_tokens: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 180,
        }
    }
}

impl ProviderConfig {
    pub fn resolved_model(&self) -> String {
        let model = self.model.trim();
        if model.is_empty() {
            self.provider_type.default_model().to_string()
        } else {
            model.to_string()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(format!("Temperature must be between 0.0 and 2.0, got {}", temp));
            }
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Base URL must be http(s), got '{}'", url));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Inline key first, then the configured (or default) environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ApiError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        let env_name = self
            .api_key_env
            .clone()
            .unwrap_or_else(|| self.provider_type.default_api_key_env().to_string());
        std::env::var(&env_name)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ApiError::ConfigError(format!("{} not configured", env_name)))
    }
}

/// Build a provider client from configuration.
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn CompletionProvider>, ApiError> {
    config.validate().map_err(ApiError::ConfigError)?;
    let http = build_provider_http_client(config)?;
    let api_key = config.resolve_api_key()?;

    let client: Arc<dyn CompletionProvider> = match config.provider_type {
        ProviderType::Gemini => Arc::new(GeminiClient::new(http, config, api_key)),
        ProviderType::OpenAI => Arc::new(OpenAIClient::new(http, config, api_key)),
    };
    Ok(client)
}

fn build_provider_http_client(config: &ProviderConfig) -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}
