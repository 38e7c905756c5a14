//! Convergence loop: grow a document until it reaches a word-count target.

use crate::error::{ApiError, StorageError};
use crate::generation::catalog::expand_section_prompt;
use crate::generation::client::GenerationClient;
use crate::generation::text::{count_words, trailing_excerpt};
use crate::store::PartStore;
use crate::types::{Document, Part};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Convergence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub target_words: usize,
    pub max_rounds: usize,
    /// Requested size of each expansion, in words
    pub words_per_expansion: usize,
    /// Characters of existing content sent as the continuation anchor
    pub anchor_chars: usize,
    /// Section keys expanded each round, in order
    pub priority_keys: Vec<String>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            target_words: 12_000,
            max_rounds: 3,
            words_per_expansion: 600,
            anchor_chars: 1_000,
            priority_keys: [
                "theoreticalFramework",
                "theoretical.background",
                "theoretical.bases",
                "methodology",
                "methodology.design",
                "methodology.analysisPlan",
                "results",
                "discussion",
                "conclusions",
                "introduction.problemStatement",
                "introduction.justification",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    pub initial_words: usize,
    pub final_words: usize,
    pub target_words: usize,
    pub rounds_run: usize,
    pub successful_expansions: usize,
    pub failed_expansions: usize,
    pub target_reached: bool,
}

pub struct ConvergenceLoop<'a> {
    client: &'a GenerationClient,
    parts: &'a dyn PartStore,
    config: &'a ConvergenceConfig,
}

impl<'a> ConvergenceLoop<'a> {
    pub fn new(
        client: &'a GenerationClient,
        parts: &'a dyn PartStore,
        config: &'a ConvergenceConfig,
    ) -> Self {
        Self {
            client,
            parts,
            config,
        }
    }

    /// Expand priority sections until `target_words` is reached or
    /// `max_rounds` passes are spent.
    ///
    /// Only the initial read of the document's parts can fail; expansion
    /// failures are logged and counted.
    pub async fn run(
        &self,
        document: &Document,
        contexts: &[String],
        target_words: usize,
        max_rounds: usize,
    ) -> Result<ConvergenceOutcome, StorageError> {
        let mut by_key: HashMap<String, Part> = self
            .parts
            .find_by_document(&document.id)?
            .into_iter()
            .map(|part| (part.key.clone(), part))
            .collect();

        let initial_words: usize = by_key.values().map(Part::word_count).sum();
        let mut outcome = ConvergenceOutcome {
            initial_words,
            final_words: initial_words,
            target_words,
            ..ConvergenceOutcome::default()
        };
        if initial_words >= target_words {
            outcome.target_reached = true;
            return Ok(outcome);
        }

        info!(
            document_id = %document.id,
            words = initial_words,
            target = target_words,
            "Below word target, expanding sections"
        );

        let mut total = initial_words;
        'rounds: for _ in 0..max_rounds {
            outcome.rounds_run += 1;
            for key in &self.config.priority_keys {
                if total >= target_words {
                    break 'rounds;
                }
                let Some(part) = by_key.get_mut(key) else {
                    continue;
                };
                match self.expand(document, contexts, part).await {
                    Ok(Some(added)) => {
                        total += added;
                        outcome.successful_expansions += 1;
                    }
                    Ok(None) => {
                        debug!(document_id = %document.id, key = %key, "Empty expansion skipped");
                    }
                    Err(err) => {
                        warn!(
                            document_id = %document.id,
                            key = %key,
                            error = %err,
                            "Expansion failed"
                        );
                        outcome.failed_expansions += 1;
                    }
                }
            }
            if total >= target_words {
                break;
            }
        }

        outcome.final_words = total;
        outcome.target_reached = total >= target_words;
        info!(
            document_id = %document.id,
            words = total,
            rounds = outcome.rounds_run,
            reached = outcome.target_reached,
            "Convergence finished"
        );
        Ok(outcome)
    }

    /// One expansion call. Returns the number of words appended.
    async fn expand(
        &self,
        document: &Document,
        contexts: &[String],
        part: &mut Part,
    ) -> Result<Option<usize>, ApiError> {
        let anchor = trailing_excerpt(&part.content, self.config.anchor_chars);
        let prompt = expand_section_prompt(
            &part.key,
            &document.title,
            anchor,
            self.config.words_per_expansion,
            document.discipline.as_deref(),
        );
        let addition = self.client.generate_with_context(contexts, &prompt).await?;
        let addition = addition.trim();
        if addition.is_empty() {
            return Ok(None);
        }

        let mut updated = part.clone();
        updated.content = if part.content.trim().is_empty() {
            addition.to_string()
        } else {
            format!("{}\n\n{}", part.content, addition)
        };
        *part = self.parts.save(&updated)?;
        Ok(Some(count_words(addition)))
    }
}
