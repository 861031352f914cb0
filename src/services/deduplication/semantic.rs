//! Semantic similarity deduplication.
//!
//! Scores every incoming entry against the consolidated entries with the
//! language model and merges it into the best match at or above the
//! threshold. Failed comparisons count as "no match"; when every comparison
//! for an entry fails, the entry is matched exactly instead (or appended,
//! with fallback disabled), so a dead provider never loses entries.

use crate::llm::prompts::similarity_prompt;
use crate::llm::{LlmError, LlmProvider, LlmTask, extract_json};
use crate::models::{Entry, truncate_chars};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::instrument;

use super::config::DeduplicationConfig;
use super::exact_match::Consolidated;
use super::types::{DedupOutcome, DedupStats, Deduplicator};

static SIMILARITY_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{[^{}]*"similarity"[^{}]*\}"#).unwrap_or_else(|_| unreachable!())
});

/// A parsed similarity judgement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarityScore {
    /// Score in `[0, 1]`.
    #[serde(default)]
    pub similarity: f64,
    /// The model's rationale.
    #[serde(default)]
    pub reason: String,
}

/// Parses a similarity response, clamping the score into `[0, 1]`.
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] when no JSON object with a
/// `similarity` field can be read from the response.
pub fn parse_similarity(response: &str) -> Result<SimilarityScore, LlmError> {
    let parsed = serde_json::from_str::<SimilarityScore>(extract_json(response)).or_else(|e| {
        SIMILARITY_OBJECT
            .find(response)
            .and_then(|m| serde_json::from_str::<SimilarityScore>(m.as_str()).ok())
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!(
                    "could not parse similarity from response ({e}): {}",
                    truncate_chars(response, 200)
                ))
            })
    })?;

    let similarity = if parsed.similarity.is_nan() {
        0.0
    } else {
        parsed.similarity.clamp(0.0, 1.0)
    };
    if (similarity - parsed.similarity).abs() > f64::EPSILON {
        tracing::warn!(
            score = parsed.similarity,
            "Language model returned similarity outside [0, 1], clamping"
        );
    }
    Ok(SimilarityScore {
        similarity,
        reason: parsed.reason,
    })
}

/// Deduplicator that matches entries by language-model similarity.
pub struct SemanticDeduplicator {
    llm: Arc<dyn LlmProvider>,
    config: DeduplicationConfig,
}

impl SemanticDeduplicator {
    /// Creates a new semantic deduplicator.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: DeduplicationConfig) -> Self {
        Self { llm, config }
    }

    /// Scores how likely two entries describe the same underlying error.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`LlmError::InvalidResponse`] when
    /// the answer cannot be parsed.
    pub fn similarity(&self, first: &Entry, second: &Entry) -> Result<f64, LlmError> {
        let response = self
            .llm
            .complete_for_task(&similarity_prompt(first, second), LlmTask::Deduplication)?;
        let score = parse_similarity(&response)?;
        tracing::debug!(
            similarity = score.similarity,
            reason = %truncate_chars(&score.reason, 100),
            "Similarity calculated"
        );
        Ok(score.similarity)
    }

    /// Deduplicates `new` against `existing` by similarity.
    #[instrument(skip_all, fields(new = new.len(), existing = existing.len(), provider = self.llm.name()))]
    pub fn dedupe(&self, new: &[Entry], existing: &[Entry]) -> Vec<Entry> {
        let threshold = self.config.effective_threshold();
        let mut consolidated = Consolidated::with_capacity(new.len() + existing.len());
        for entry in existing {
            consolidated.push(entry.clone());
        }

        let mut stats = DedupStats::default();
        for entry in new {
            let outcome = self.place(&mut consolidated, entry, threshold, &mut stats);
            stats.record(outcome);
        }

        tracing::info!(
            merged = stats.merged,
            variants = stats.variants,
            appended = stats.appended,
            llm_failures = stats.llm_failures,
            threshold,
            "AI deduplication complete"
        );
        consolidated.into_entries()
    }

    fn place(
        &self,
        consolidated: &mut Consolidated,
        entry: &Entry,
        threshold: f64,
        stats: &mut DedupStats,
    ) -> DedupOutcome {
        let mut best: Option<(usize, f64)> = None;
        let mut failures = 0;
        let candidates = consolidated.entries().len();

        for (idx, candidate) in consolidated.entries().iter().enumerate() {
            match self.similarity(entry, candidate) {
                Ok(score) if score >= threshold && best.is_none_or(|(_, top)| score > top) => {
                    best = Some((idx, score));
                },
                Ok(_) => {},
                Err(e) => {
                    failures += 1;
                    tracing::debug!(error = %e, "Similarity comparison failed");
                },
            }
        }
        stats.llm_failures += failures;

        if let Some((idx, score)) = best {
            tracing::debug!(
                signature = %truncate_chars(entry.error_signature(), 50),
                similarity = score,
                "Merging similar entry"
            );
            return consolidated.merge_or_vary(idx, entry.clone());
        }

        if candidates > 0 && failures == candidates && self.config.fallback_to_exact {
            tracing::info!(
                signature = %truncate_chars(entry.error_signature(), 50),
                "Language model failed for every comparison, matching exactly"
            );
            return consolidated.absorb(entry.clone());
        }

        consolidated.push(entry.clone());
        DedupOutcome::Appended
    }
}

impl Deduplicator for SemanticDeduplicator {
    fn deduplicate(&self, new: &[Entry], existing: &[Entry]) -> Vec<Entry> {
        self.dedupe(new, existing)
    }
}
