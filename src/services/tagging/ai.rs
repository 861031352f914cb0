//! Language-model tagging with rule-based fallback.

use super::Tagger;
use super::rules::generate_tags_rule_based;
use crate::llm::prompts::tagging_prompt;
use crate::llm::{LlmError, LlmProvider, LlmTask, extract_json};
use crate::models::{Entry, truncate_chars};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

/// Tag count below which combine mode adds rule-based tags.
pub const MIN_TAGS: usize = 3;
/// Maximum tags kept from one generation.
pub const MAX_TAGS: usize = 5;

static TAGS_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{[^{}]*"tags"[^{}]*\}"#).unwrap_or_else(|_| unreachable!())
});
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\s]+").unwrap_or_else(|_| unreachable!()));
static INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").unwrap_or_else(|_| unreachable!()));

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Vec<serde_json::Value>,
}

/// Tagger that asks the language model for 3-5 tags.
pub struct AiTagger {
    llm: Arc<dyn LlmProvider>,
    fallback_to_rule_based: bool,
    combine_with_rule_based: bool,
}

impl AiTagger {
    /// Creates an AI tagger that falls back to the rule tables on failure.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            fallback_to_rule_based: true,
            combine_with_rule_based: false,
        }
    }

    /// Sets whether a model failure falls back to rule-based tags.
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_rule_based = enabled;
        self
    }

    /// Sets whether rule-based tags fill in when the model returns fewer
    /// than [`MIN_TAGS`].
    #[must_use]
    pub const fn with_combine(mut self, enabled: bool) -> Self {
        self.combine_with_rule_based = enabled;
        self
    }

    fn request_tags(&self, entry: &Entry) -> std::result::Result<Vec<String>, LlmError> {
        let response = self
            .llm
            .complete_for_task(&tagging_prompt(entry), LlmTask::Tagging)?;
        parse_tags_response(&response)
    }
}

impl Tagger for AiTagger {
    fn generate(&self, entry: &Entry) -> Result<Vec<String>> {
        let mut tags = match self.request_tags(entry) {
            Ok(tags) => tags,
            Err(e) if self.fallback_to_rule_based => {
                tracing::warn!(
                    signature = %truncate_chars(entry.error_signature(), 50),
                    error = %e,
                    "AI tagging failed, falling back to rule-based tags"
                );
                return Ok(generate_tags_rule_based(entry));
            },
            Err(e) => {
                return Err(Error::OperationFailed {
                    operation: "generate_tags_ai".to_string(),
                    cause: e.to_string(),
                });
            },
        };

        if self.combine_with_rule_based && tags.len() < MIN_TAGS {
            tracing::debug!(ai_tags = tags.len(), "Combining AI tags with rule-based tags");
            for tag in generate_tags_rule_based(entry) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags.sort();
        }
        tags.truncate(MAX_TAGS);

        tracing::debug!(tags = ?tags, "Generated AI tags");
        Ok(tags)
    }
}

/// Reads the `tags` list from a model response and normalizes it.
///
/// Non-string items are skipped; the result is deduplicated in order and
/// capped at [`MAX_TAGS`].
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] when no object with a `tags` field
/// can be parsed.
pub fn parse_tags_response(response: &str) -> std::result::Result<Vec<String>, LlmError> {
    let parsed = serde_json::from_str::<TagsResponse>(extract_json(response)).or_else(|e| {
        TAGS_OBJECT
            .find(response)
            .and_then(|m| serde_json::from_str::<TagsResponse>(m.as_str()).ok())
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!(
                    "could not parse tags from response ({e}): {}",
                    truncate_chars(response, 200)
                ))
            })
    })?;

    let mut tags: Vec<String> = Vec::new();
    for tag in parsed.tags.iter().filter_map(serde_json::Value::as_str) {
        let tag = normalize_tag(tag);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.truncate(MAX_TAGS);
    Ok(tags)
}

/// Lowercases, turns whitespace and underscores into hyphens and drops
/// anything outside `[a-z0-9-]`.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    let lowered = tag.trim().to_lowercase();
    let hyphenated = SEPARATORS.replace_all(&lowered, "-");
    INVALID.replace_all(&hyphenated, "").into_owned()
}
