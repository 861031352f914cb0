//! Process rule extraction.
//!
//! Groups process issues by issue type and asks the language model for one
//! to three general rules per group. When the model is unavailable or its
//! answer holds no usable rule, each issue is projected into a rule of its
//! own, so no issue is ever left without a rule.

use crate::llm::prompts::rule_extraction_prompt;
use crate::llm::{LlmError, LlmProvider, LlmTask, extract_json};
use crate::models::{Entry, ProcessRule, truncate_chars};
use crate::rendering::GENERAL_CATEGORY;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

const DEFAULT_TITLE: &str = "Unnamed rule";
const DEFAULT_RULE: &str = "Rule statement missing.";
const DEFAULT_WHY: &str = "Rationale pending.";
const DEFAULT_GOOD: &str = "Follows the rule.";
const DEFAULT_BAD: &str = "Rule violation observed.";

/// Extracts [`ProcessRule`]s from process issues.
pub struct RuleExtractor {
    llm: Option<Arc<dyn LlmProvider>>,
    fallback_to_basic: bool,
}

impl Default for RuleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleExtractor {
    /// Creates an extractor that only uses the deterministic projection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            llm: None,
            fallback_to_basic: true,
        }
    }

    /// Sets the language model used to generalize rules.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Sets whether a model failure falls back to one rule per issue.
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_basic = enabled;
        self
    }

    /// Extracts rules from the process issues among `entries`.
    ///
    /// Groups are processed in issue-type order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the model fails and fallback is disabled.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn extract(&self, entries: &[Entry]) -> Result<Vec<ProcessRule>> {
        let mut groups: BTreeMap<&str, Vec<&Entry>> = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.is_process_issue()) {
            let key = match entry.error_type() {
                "" => GENERAL_CATEGORY,
                issue_type => issue_type,
            };
            groups.entry(key).or_default().push(entry);
        }
        if groups.is_empty() {
            tracing::debug!("No process issues to extract rules from");
            return Ok(Vec::new());
        }

        let mut rules = Vec::new();
        for (issue_type, group) in groups {
            let extracted = self.extract_group(&group)?;
            tracing::debug!(
                issue_type,
                issues = group.len(),
                rules = extracted.len(),
                "Extracted rules for group"
            );
            rules.extend(extracted);
        }
        Ok(rules)
    }

    /// Extracts rules from one group of process issues.
    ///
    /// # Errors
    ///
    /// Returns an error only when the model fails and fallback is disabled.
    pub fn extract_group(&self, group: &[&Entry]) -> Result<Vec<ProcessRule>> {
        if group.is_empty() {
            return Ok(Vec::new());
        }
        let Some(llm) = &self.llm else {
            return Ok(self.fallback(group));
        };

        let outcome = llm
            .complete_for_task(&rule_extraction_prompt(group), LlmTask::RuleExtraction)
            .and_then(|response| parse_rules_response(&response));
        match outcome {
            Ok(rules) if !rules.is_empty() => Ok(rules),
            Ok(_) => {
                tracing::warn!("Language model returned no valid rules, using basic extraction");
                Ok(self.fallback(group))
            },
            Err(e) if self.fallback_to_basic => {
                tracing::warn!(error = %e, "Rule extraction via language model failed, using basic extraction");
                Ok(basic_rules(group))
            },
            Err(e) => Err(Error::OperationFailed {
                operation: "extract_rules".to_string(),
                cause: e.to_string(),
            }),
        }
    }

    fn fallback(&self, group: &[&Entry]) -> Vec<ProcessRule> {
        if self.fallback_to_basic {
            basic_rules(group)
        } else {
            Vec::new()
        }
    }
}

/// One rule per issue, built from the issue's own fields.
#[must_use]
pub fn basic_rules(group: &[&Entry]) -> Vec<ProcessRule> {
    group.iter().map(|entry| basic_rule(entry)).collect()
}

fn basic_rule(entry: &Entry) -> ProcessRule {
    let title = first_non_empty(&[entry.error_signature(), entry.error_type()], "Process rule");
    let rule = first_non_empty(
        &[entry.fix_code(), entry.explanation()],
        "Follow established process.",
    );
    let why = first_non_empty(
        &[entry.explanation(), entry.fix_code()],
        "Avoid recurrence of this issue.",
    );
    let examples_good = if entry.explanation().is_empty() {
        vec![DEFAULT_GOOD.to_string()]
    } else {
        vec![truncate_chars(entry.explanation(), 200)]
    };
    let examples_bad = if entry.result().is_empty() {
        vec![DEFAULT_BAD.to_string()]
    } else {
        vec![entry.result().to_string()]
    };

    let mut related_errors = Vec::new();
    if !entry.error_type().is_empty() {
        related_errors.push(entry.error_type().to_string());
    }
    if !entry.error_signature().is_empty() && entry.error_signature() != entry.error_type() {
        related_errors.push(entry.error_signature().to_string());
    }

    ProcessRule {
        title,
        rule,
        why,
        examples_good,
        examples_bad,
        related_errors,
    }
    .bounded()
}

fn first_non_empty(candidates: &[&str], default: &str) -> String {
    candidates
        .iter()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Parses `{"rules": [...]}` from a model response.
///
/// Missing fields get placeholder text; a `rules` value that is not a list
/// yields no rules.
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] when the response is not JSON.
pub fn parse_rules_response(response: &str) -> std::result::Result<Vec<ProcessRule>, LlmError> {
    let data: Value = serde_json::from_str(extract_json(response)).map_err(|e| {
        LlmError::InvalidResponse(format!(
            "could not parse rules from response ({e}): {}",
            truncate_chars(response, 300)
        ))
    })?;

    let Some(raw_rules) = data.get("rules").and_then(Value::as_array) else {
        tracing::warn!("Language model response has no 'rules' list");
        return Ok(Vec::new());
    };

    Ok(raw_rules
        .iter()
        .filter(|raw| raw.is_object())
        .map(|raw| {
            ProcessRule {
                title: text_field(raw, "title", DEFAULT_TITLE),
                rule: text_field(raw, "rule", DEFAULT_RULE),
                why: text_field(raw, "why", DEFAULT_WHY),
                examples_good: list_field(raw, "examples_good", Some(DEFAULT_GOOD)),
                examples_bad: list_field(raw, "examples_bad", Some(DEFAULT_BAD)),
                related_errors: list_field(raw, "related_errors", None),
            }
            .bounded()
        })
        .collect())
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn text_field(raw: &Value, key: &str, default: &str) -> String {
    raw.get(key)
        .and_then(value_text)
        .unwrap_or_else(|| default.to_string())
}

fn list_field(raw: &Value, key: &str, default: Option<&str>) -> Vec<String> {
    let items: Vec<String> = raw
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(value_text).collect())
        .unwrap_or_default();
    match default {
        Some(default) if items.is_empty() => vec![default.to_string()],
        _ => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    fn issue(signature: &str, issue_type: &str) -> Entry {
        Entry::process_issue(signature)
            .error_type(issue_type)
            .explanation("Agent edited a file without reading it.")
            .fix_code("Always read a file before editing it.")
            .result("✅ Rule documented")
            .build()
    }

    fn extractor(llm: ScriptedLlm) -> (Arc<ScriptedLlm>, RuleExtractor) {
        let llm = Arc::new(llm);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        (llm, RuleExtractor::new().with_llm(provider))
    }

    #[test]
    fn test_basic_rule_projection() {
        let entry = issue("Blind edit", "workflow");
        let rules = basic_rules(&[&entry]);
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.title, "Blind edit");
        assert_eq!(rule.rule, "Always read a file before editing it.");
        assert_eq!(rule.why, "Agent edited a file without reading it.");
        assert_eq!(rule.examples_bad, ["✅ Rule documented"]);
        assert_eq!(rule.related_errors, ["workflow", "Blind edit"]);
    }

    #[test]
    fn test_basic_rule_defaults() {
        let entry = Entry::process_issue("").build();
        let rule = &basic_rules(&[&entry])[0];
        assert_eq!(rule.title, "Process rule");
        assert_eq!(rule.rule, "Follow established process.");
        assert_eq!(rule.why, "Avoid recurrence of this issue.");
        assert_eq!(rule.examples_good, [DEFAULT_GOOD]);
        assert_eq!(rule.examples_bad, [DEFAULT_BAD]);
        assert!(rule.related_errors.is_empty());
    }

    #[test]
    fn test_without_llm_every_issue_gets_a_rule() {
        let entries = vec![
            issue("b", "workflow"),
            Entry::error("not a process issue").build(),
            issue("a", ""),
            issue("c", "workflow"),
        ];
        let rules = RuleExtractor::new().extract(&entries).expect("rules");
        let titles: Vec<&str> = rules.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn test_llm_rules_are_used() {
        let response = r#"```json
{"rules": [{"title": "Read before edit", "rule": "Open files first.", "why": "Stale edits.",
  "examples_good": ["read then patch"], "examples_bad": [], "related_errors": ["workflow", null]}]}
```"#;
        let (llm, extractor) = extractor(ScriptedLlm::new([Ok(response.to_string())]));
        let entries = vec![issue("x", "workflow"), issue("y", "workflow")];
        let rules = extractor.extract(&entries).expect("rules");

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].title, "Read before edit");
        assert_eq!(rules[0].examples_bad, [DEFAULT_BAD]);
        assert_eq!(rules[0].related_errors, ["workflow"]);
        assert_eq!(llm.call_count(), 1);
        let calls = llm.calls.lock().expect("lock");
        assert_eq!(calls[0].0, LlmTask::RuleExtraction);
        assert!(calls[0].1.contains("--- Issue 2 ---"));
    }

    #[test]
    fn test_model_failure_falls_back() {
        let (_, extractor) = extractor(ScriptedLlm::failing());
        let entries = vec![issue("x", "workflow"), issue("y", "workflow")];
        assert_eq!(extractor.extract(&entries).expect("rules").len(), 2);
    }

    #[test]
    fn test_model_failure_without_fallback_is_error() {
        let (_, extractor) = extractor(ScriptedLlm::failing());
        let entries = vec![issue("x", "workflow")];
        assert!(extractor.with_fallback(false).extract(&entries).is_err());
    }

    #[test]
    fn test_empty_rules_list_falls_back() {
        let (_, extractor) = extractor(ScriptedLlm::always(Ok(r#"{"rules": []}"#.to_string())));
        let entries = vec![issue("x", "workflow")];
        let rules = extractor.extract(&entries).expect("rules");
        assert_eq!(rules[0].title, "x");
    }

    #[test]
    fn test_parse_rules_defaults_and_bounds() {
        let long = "t".repeat(300);
        let response = format!(r#"{{"rules": [{{"title": "{long}"}}, "skip me"]}}"#);
        let rules = parse_rules_response(&response).expect("parse");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].title.len(), ProcessRule::MAX_TITLE_CHARS);
        assert_eq!(rules[0].rule, DEFAULT_RULE);
        assert_eq!(rules[0].why, DEFAULT_WHY);
        assert_eq!(rules[0].examples_good, [DEFAULT_GOOD]);
        assert!(rules[0].related_errors.is_empty());
    }

    #[test]
    fn test_parse_rules_non_list_is_empty() {
        assert!(parse_rules_response(r#"{"rules": "none"}"#).expect("parse").is_empty());
        assert!(parse_rules_response("not json").is_err());
    }
}
