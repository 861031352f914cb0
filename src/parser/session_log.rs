//! Raw session log (`errors_and_fixes.md`) parser.

use super::{Block, BlockFields, split_blocks};
use crate::models::{Entry, EntryKind};
use regex::Regex;
use std::sync::LazyLock;

/// Issue type recorded when a process issue names none.
pub const DEFAULT_ISSUE_TYPE: &str = "agent-process";

static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s+(Error|Agent Process Issue):\s*(.*)$").unwrap_or_else(|_| unreachable!())
});

/// Parses a raw session log into entries in document order.
///
/// Anything before the first `### Error:` or `### Agent Process Issue:`
/// heading (the log's own header) is ignored, as are headings with an empty
/// body. Blocks with an unparseable timestamp are dropped with a warning.
pub fn parse_session_log(text: &str) -> Vec<Entry> {
    let blocks = split_blocks(text, |line| {
        let caps = BLOCK_HEADER.captures(line)?;
        let kind = if &caps[1] == "Error" {
            EntryKind::Error
        } else {
            EntryKind::ProcessIssue
        };
        let title = caps.get(2).map_or("", |m| m.as_str().trim());
        Some((kind, title))
    });

    let entries: Vec<Entry> = blocks.iter().filter_map(build_entry).collect();
    tracing::debug!(
        blocks = blocks.len(),
        entries = entries.len(),
        "Parsed session log"
    );
    entries
}

fn build_entry(block: &Block<'_, (EntryKind, &str)>) -> Option<Entry> {
    let (kind, title) = block.head;
    if block.lines.iter().all(|line| line.trim().is_empty()) {
        return None;
    }
    let fields = BlockFields::scan(&block.lines);

    let timestamp = match fields.timestamp() {
        Ok(ts) => ts,
        Err(raw) => {
            tracing::warn!(
                signature = title,
                timestamp = %raw,
                "Dropping session log entry with invalid timestamp"
            );
            return None;
        },
    };

    let entry = match kind {
        EntryKind::Error => {
            let error_type = fields
                .metadata("error_type")
                .map_or_else(|| type_from_title(title), str::to_string);
            Entry::error(title)
                .error_type(error_type)
                .file(fields.text("file"))
                .line(fields.count("line"))
                .fix_code(fields.code("fix applied").unwrap_or_default())
                .explanation(fields.section("explanation"))
                .result(fields.text("result"))
                .success_count(fields.count("success_count"))
        },
        EntryKind::ProcessIssue => {
            let rule = fields.section("rule established");
            let description = match fields.section("issue description") {
                "" => rule,
                text => text,
            };
            Entry::process_issue(title)
                .error_type(fields.metadata("issue_type").unwrap_or(DEFAULT_ISSUE_TYPE))
                .fix_code(rule)
                .explanation(description)
                .result(fields.text("result"))
        },
    };

    Some(entry.tags(fields.tags()).timestamp(timestamp).build())
}

/// `"TypeError: bad operand"` yields `"TypeError"`; a title without a colon
/// is its own type.
fn type_from_title(title: &str) -> String {
    title
        .split_once(':')
        .map_or(title, |(prefix, _)| prefix)
        .trim()
        .to_string()
}
