//! Generation client: every provider call in the pipeline goes through here.
//!
//! One client owns one [`DispatchGate`]; concurrency and pacing are therefore
//! per instance. Calls are retried according to [`RetryPolicy`], bounded by an
//! optional per-call timeout, and their output is normalized before returning.

use crate::error::ProviderError;
use crate::generation::gate::DispatchGate;
use crate::generation::retry::RetryPolicy;
use crate::generation::text::{compose_input, normalize_text};
use crate::provider::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Gate, retry and prompt-budget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum provider calls in flight
    pub max_concurrent: usize,
    /// Minimum spacing between two dispatches (milliseconds)
    pub min_interval_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First fallback backoff delay (milliseconds)
    pub base_retry_delay_ms: u64,
    /// Ceiling for the fallback backoff (milliseconds)
    pub max_retry_delay_ms: u64,
    /// Per-call timeout in seconds; 0 disables it
    pub call_timeout_secs: u64,
    /// Character budget for concatenated context blocks
    pub context_budget_chars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            min_interval_ms: 250,
            max_retries: 4,
            base_retry_delay_ms: 2_000,
            max_retry_delay_ms: 30_000,
            call_timeout_secs: 120,
            context_budget_chars: 60_000,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".to_string());
        }
        if self.base_retry_delay_ms > self.max_retry_delay_ms {
            return Err(format!(
                "base_retry_delay_ms ({}) exceeds max_retry_delay_ms ({})",
                self.base_retry_delay_ms, self.max_retry_delay_ms
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

pub struct GenerationClient {
    provider: Arc<dyn CompletionProvider>,
    gate: DispatchGate,
    retry: RetryPolicy,
    call_timeout: Option<Duration>,
    context_budget_chars: usize,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &ClientConfig) -> Self {
        Self {
            provider,
            gate: DispatchGate::new(
                config.max_concurrent,
                Duration::from_millis(config.min_interval_ms),
            ),
            retry: config.retry_policy(),
            call_timeout: config.call_timeout(),
            context_budget_chars: config.context_budget_chars,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.dispatch(prompt).await
    }

    pub async fn generate_with_context(
        &self,
        contexts: &[String],
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let input = compose_input(contexts, prompt, self.context_budget_chars);
        self.dispatch(&input).await
    }

    pub fn gate(&self) -> &DispatchGate {
        &self.gate
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    async fn dispatch(&self, input: &str) -> Result<String, ProviderError> {
        let mut retry_index = 0u32;
        loop {
            match self.call_once(input, retry_index).await {
                Ok(text) => return Ok(normalize_text(&text)),
                Err(err) => match self.retry.next_delay(&err, retry_index) {
                    Some(delay) => {
                        warn!(
                            provider = self.provider.provider_name(),
                            attempt = retry_index + 1,
                            delay_ms = delay.as_millis() as u64,
                            suggested = err.retry_after().is_some(),
                            error = %err,
                            "Transient provider failure, backing off"
                        );
                        sleep(delay).await;
                        retry_index += 1;
                    }
                    None => {
                        if err.is_retryable() {
                            warn!(
                                provider = self.provider.provider_name(),
                                attempts = retry_index + 1,
                                error = %err,
                                "Provider retries exhausted"
                            );
                        }
                        return Err(err);
                    }
                },
            }
        }
    }

    async fn call_once(&self, input: &str, retry_index: u32) -> Result<String, ProviderError> {
        let permit = self.gate.acquire().await?;
        let start = Instant::now();
        debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            attempt = retry_index + 1,
            in_flight = self.gate.in_flight(),
            input_chars = input.chars().count(),
            "Provider request sent"
        );

        let outcome = match self.call_timeout {
            Some(limit) => match timeout(limit, self.provider.complete(input)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::transient(format!(
                    "Provider call timed out after {}s",
                    limit.as_secs()
                ))),
            },
            None => self.provider.complete(input).await,
        };
        drop(permit);

        if let Ok(text) = &outcome {
            info!(
                provider = self.provider.provider_name(),
                attempt = retry_index + 1,
                duration_ms = start.elapsed().as_millis() as u64,
                response_chars = text.chars().count(),
                "Provider response received"
            );
        }
        outcome
    }
}
