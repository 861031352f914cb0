//! Reverse parser for generated `coding_tips.md` documents.

use super::{BlockFields, split_blocks};
use crate::models::Entry;
use crate::rendering::markdown::parse_heading_text;

/// Parses a previously generated coding tips document back into process
/// issues.
///
/// Each `### Rule:` sub-block becomes one entry; the `##` category headings
/// are derived from tags and types and carry nothing of their own.
pub fn parse_coding_tips(text: &str) -> Vec<Entry> {
    split_blocks(text, |line| line.strip_prefix("### Rule: "))
        .into_iter()
        .filter_map(|block| {
            let signature = parse_heading_text(block.head);
            let fields = BlockFields::scan(&block.lines);
            let timestamp = match fields.timestamp() {
                Ok(ts) => ts,
                Err(raw) => {
                    tracing::warn!(signature = %signature, timestamp = %raw, "Dropping rule with invalid timestamp");
                    return None;
                },
            };
            Some(
                Entry::process_issue(signature)
                    .error_type(fields.text("issue_type"))
                    .fix_code(fields.section("rule established"))
                    .explanation(fields.section("why"))
                    .result(fields.text("result"))
                    .success_count(fields.count("success_count"))
                    .tags(fields.tags())
                    .timestamp(timestamp)
                    .build(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::generate_coding_tips_markdown;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_header_only_document() {
        assert!(parse_coding_tips(&generate_coding_tips_markdown(&[])).is_empty());
    }

    #[test]
    fn test_round_trip() {
        let ts = Utc
            .with_ymd_and_hms(2025, 3, 1, 8, 0, 0)
            .single()
            .unwrap_or(Entry::EPOCH);
        let issue = Entry::process_issue("Edited generated code")
            .error_type("workflow")
            .fix_code("Edit the template.\nRegenerate afterwards.")
            .explanation("Generated files are overwritten.")
            .result("✅ Documented")
            .tags(["agent", "codegen"])
            .timestamp(ts)
            .build();

        let doc = generate_coding_tips_markdown(std::slice::from_ref(&issue));
        assert_eq!(parse_coding_tips(&doc), vec![issue]);
    }

    #[test]
    fn test_category_headings_are_ignored() {
        let text = "## General\n\n### Rule: \\_private\\_ access\n**Timestamp:** 2025-01-01T00:00:00Z\n\n**Rule Established:** Use the API.\n";
        let entries = parse_coding_tips(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error_signature(), "_private_ access");
        assert_eq!(entries[0].fix_code(), "Use the API.");
        assert!(entries[0].is_process_issue());
    }
}
