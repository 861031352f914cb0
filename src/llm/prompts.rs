//! Prompt builders for the consolidation tasks.
//!
//! Every prompt asks for a bare JSON object; responses go through
//! [`super::extract_json`] before parsing.

use crate::models::{Entry, truncate_chars};
use std::fmt::Write as _;

/// Characters of explanation quoted per entry.
const CONTEXT_CHARS: usize = 500;
/// Characters of fix code quoted per entry.
const FIX_CHARS: usize = 300;

fn or_na(text: &str, max: usize) -> String {
    if text.is_empty() {
        "N/A".to_string()
    } else {
        truncate_chars(text, max)
    }
}

fn describe_entry(out: &mut String, entry: &Entry) {
    let _ = writeln!(out, "- Error Signature: {}", entry.error_signature());
    let _ = writeln!(out, "- Error Type: {}", entry.error_type());
    let _ = writeln!(out, "- File: {}", entry.file());
    let _ = writeln!(out, "- Line: {}", entry.line());
    let _ = writeln!(
        out,
        "- Error Context: {}",
        or_na(entry.explanation(), CONTEXT_CHARS)
    );
    let _ = writeln!(out, "- Fix Code: {}", or_na(entry.fix_code(), FIX_CHARS));
}

/// Asks whether two entries describe the same underlying error.
///
/// Expected answer: `{"similarity": 0.95, "reason": "..."}`.
#[must_use]
pub fn similarity_prompt(first: &Entry, second: &Entry) -> String {
    let mut out = String::from(
        "Compare these two error entries and determine if they represent the same underlying error.\n\nError Entry 1:\n",
    );
    describe_entry(&mut out, first);
    out.push_str("\nError Entry 2:\n");
    describe_entry(&mut out, second);
    out.push_str(
        r#"
Analyze if these errors are semantically similar (represent the same underlying issue, even if wording differs).

Respond with a JSON object in this exact format:
{
    "similarity": 0.95,
    "reason": "Both errors are FileNotFoundError when opening a config file, with different paths"
}

Similarity score should be:
- 0.9-1.0: Same error (different wording, same root cause)
- 0.7-0.89: Similar error (related but different root cause)
- 0.0-0.69: Different errors

Only respond with the JSON object, no additional text."#,
    );
    out
}

/// Asks for three to five lookup tags for one entry.
///
/// Expected answer: `{"tags": ["file-io", "docker"]}`.
#[must_use]
pub fn tagging_prompt(entry: &Entry) -> String {
    let mut out = String::from(
        "Generate context tags for this error entry. Tags should help categorize and find this error in a registry.\n\nError Entry Details:\n",
    );
    describe_entry(&mut out, entry);
    out.push_str(
        r#"
Generate 3-5 tags that categorize this error. Tags should include:
1. Error type category (e.g., "file-io", "type-conversion", "networking", "syntax")
2. Framework/library (e.g., "docker", "django", "pytest", "react")
3. Domain/context (e.g., "database", "authentication", "api", "testing")
4. Platform (e.g., "windows", "linux", "macos", "cross-platform")
5. Additional context tags if relevant (e.g., "async", "threading", "caching")

Tag Guidelines:
- Use lowercase with hyphens (e.g., "file-io", not "FileIO" or "file_io")
- Be specific but concise (single words or short phrases)
- Focus on tags that help with lookup and categorization
- Avoid redundant tags (e.g., don't include both "file-io" and "file-system")

Respond with a JSON object in this exact format:
{
    "tags": ["file-io", "docker", "configuration", "cross-platform"]
}

Only respond with the JSON object, no additional text."#,
    );
    out
}

/// Asks for one to three general rules covering a group of process issues.
///
/// Expected answer: `{"rules": [{"title": .., "rule": .., "why": ..,
/// "examples_good": [..], "examples_bad": [..], "related_errors": [..]}]}`.
#[must_use]
pub fn rule_extraction_prompt(group: &[&Entry]) -> String {
    let mut out = String::from(
        "You are given a set of Agent Process Issues (workflow/process problems encountered during coding).\n\
         Extract 1-3 general, actionable rules that would prevent or address these issues.\n\
         Each rule should have: a short title, a clear rule statement, why it matters, \
         good/bad examples, and related error signatures.\n\n\
         Process issues in this group:\n\n",
    );
    for (i, entry) in group.iter().enumerate() {
        let summary = match (entry.error_signature(), entry.error_type()) {
            ("", "") => "N/A",
            ("", error_type) => error_type,
            (signature, _) => signature,
        };
        let issue_type = match entry.error_type() {
            "" => "N/A",
            error_type => error_type,
        };
        let _ = writeln!(out, "--- Issue {} ---", i + 1);
        let _ = writeln!(out, "Summary: {}", truncate_chars(summary, 200));
        let _ = writeln!(out, "Issue Type: {issue_type}");
        let _ = writeln!(
            out,
            "Description: {}",
            truncate_chars(entry.explanation(), 600)
        );
        let _ = writeln!(
            out,
            "Rule Established: {}",
            truncate_chars(entry.fix_code(), 400)
        );
        if !entry.result().is_empty() {
            let _ = writeln!(out, "Result: {}", entry.result());
        }
        out.push('\n');
    }
    out.push_str(
        r#"Respond with a JSON object containing a single key "rules" whose value is an array of rule objects.
Each rule object must have:
  - "title": short rule title (string)
  - "rule": the rule statement (string)
  - "why": why this rule is needed (string)
  - "examples_good": array of 1-3 good example strings
  - "examples_bad": array of 1-3 bad example strings
  - "related_errors": array of related error signatures or types (strings)

Example format:
{"rules": [{"title": "Use pathlib for paths", "rule": "Always use pathlib.Path for file paths.", "why": "Avoids string concat and OS differences.", "examples_good": ["Path('config') / 'app.yaml'"], "examples_bad": ["'config' + '/' + 'app.yaml'"], "related_errors": ["FileNotFoundError", "path-concatenation"]}]}

Only respond with the JSON object, no additional text."#,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_prompt_describes_both_entries() {
        let first = Entry::error("FileNotFoundError: config.yaml")
            .error_type("FileNotFoundError")
            .file("app.py")
            .line(10)
            .build();
        let second = Entry::error("FileNotFoundError: settings.yaml").build();
        let prompt = similarity_prompt(&first, &second);
        assert!(prompt.contains("- Error Signature: FileNotFoundError: config.yaml"));
        assert!(prompt.contains("- Error Signature: FileNotFoundError: settings.yaml"));
        assert!(prompt.contains("- Line: 10"));
        assert!(prompt.contains("- Fix Code: N/A"));
        assert!(prompt.contains("\"similarity\""));
    }

    #[test]
    fn test_long_fields_are_truncated() {
        let entry = Entry::error("E").explanation("x".repeat(900)).build();
        let prompt = tagging_prompt(&entry);
        assert!(prompt.contains(&format!("- Error Context: {}\n", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_rule_prompt_numbers_issues() {
        let a = Entry::process_issue("Skipped tests")
            .error_type("testing")
            .result("✅ Documented")
            .build();
        let b = Entry::process_issue("").error_type("testing").build();
        let prompt = rule_extraction_prompt(&[&a, &b]);
        assert!(prompt.contains("--- Issue 1 ---\nSummary: Skipped tests\n"));
        assert!(prompt.contains("--- Issue 2 ---\nSummary: testing\n"));
        assert!(prompt.contains("Result: ✅ Documented"));
        assert_eq!(prompt.matches("Result: ").count(), 1);
    }
}
