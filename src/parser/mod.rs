//! Markdown parsers for session logs and generated documents.
//!
//! All three document shapes share one line scanner. A document is split
//! into blocks at heading lines (ignoring anything inside fenced code), and
//! each block body is walked by [`BlockFields::scan`], a small state machine
//! that collects `**Key:** value` metadata, labeled free-text sections and
//! labeled fenced code blocks.
//!
//! Parsing never fails: a block that cannot become an [`Entry`](crate::Entry)
//! is dropped with a warning and the rest of the document is still read.

mod coding_tips;
mod fix_repo;
mod session_log;

pub use coding_tips::parse_coding_tips;
pub use fix_repo::parse_fix_repo;
pub use session_log::parse_session_log;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// A heading line and the body lines up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block<'a, H> {
    pub head: H,
    pub lines: Vec<&'a str>,
}

/// Splits `text` at lines for which `classify` returns a heading.
///
/// Lines before the first heading are discarded. Headings inside fenced
/// code are treated as body text.
pub(crate) fn split_blocks<'a, H>(
    text: &'a str,
    classify: impl Fn(&'a str) -> Option<H>,
) -> Vec<Block<'a, H>> {
    let mut blocks: Vec<Block<'a, H>> = Vec::new();
    let mut fence: Option<usize> = None;

    for line in text.lines() {
        if let Some(open) = fence {
            if closes_fence(line, open) {
                fence = None;
            }
            if let Some(block) = blocks.last_mut() {
                block.lines.push(line);
            }
            continue;
        }
        if let Some(len) = opens_fence(line) {
            fence = Some(len);
        } else if let Some(head) = classify(line) {
            blocks.push(Block {
                head,
                lines: Vec::new(),
            });
            continue;
        }
        if let Some(block) = blocks.last_mut() {
            block.lines.push(line);
        }
    }

    blocks
}

/// Returns the backtick count of an opening fence line.
pub(crate) fn opens_fence(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let len = trimmed.chars().take_while(|c| *c == '`').count();
    (len >= 3).then_some(len)
}

fn closes_fence(line: &str, open: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= open && trimmed.chars().all(|c| c == '`')
}

/// Lowercases a label and turns spaces into underscores.
pub(crate) fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Splits a `**Key:** rest` line into its normalized key and trimmed rest.
fn parse_label_line(line: &str) -> Option<(String, &str)> {
    let inner = line.trim().strip_prefix("**")?;
    let end = inner.find(":**")?;
    let key = inner[..end].trim();
    if key.is_empty() || key.contains('*') || key.contains(':') {
        return None;
    }
    Some((normalize_key(key), inner[end + 3..].trim()))
}

/// Fields found in one block body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct BlockFields {
    metadata: HashMap<String, String>,
    sections: HashMap<String, String>,
    code_blocks: HashMap<String, String>,
}

enum ScanState<'a> {
    Idle,
    Section {
        label: String,
        lines: Vec<&'a str>,
        awaiting_fence: bool,
    },
    Fence {
        label: Option<String>,
        len: usize,
        lines: Vec<&'a str>,
    },
}

impl BlockFields {
    /// Walks the body of one block.
    pub fn scan<'a>(lines: &[&'a str]) -> Self {
        let mut fields = Self::default();
        let mut state = ScanState::Idle;

        for &line in lines {
            state = match state {
                ScanState::Fence {
                    label,
                    len,
                    mut lines,
                } => {
                    if closes_fence(line, len) {
                        fields.finish_fence(label, &lines);
                        ScanState::Idle
                    } else {
                        lines.push(line);
                        ScanState::Fence { label, len, lines }
                    }
                },
                other => fields.step(other, line),
            };
        }

        match state {
            ScanState::Fence { label, lines, .. } => fields.finish_fence(label, &lines),
            other => fields.finish_section(other),
        }
        fields
    }

    fn step<'a>(&mut self, state: ScanState<'a>, line: &'a str) -> ScanState<'a> {
        if let Some(len) = opens_fence(line) {
            let label = match state {
                ScanState::Section {
                    label,
                    awaiting_fence: true,
                    ..
                } => Some(label),
                other => {
                    self.finish_section(other);
                    None
                },
            };
            return ScanState::Fence {
                label,
                len,
                lines: Vec::new(),
            };
        }

        if let Some((key, rest)) = parse_label_line(line) {
            self.finish_section(state);
            if !rest.is_empty() {
                self.metadata
                    .insert(key.clone(), rest.trim_matches('`').trim().to_string());
            }
            return ScanState::Section {
                label: key,
                lines: if rest.is_empty() { Vec::new() } else { vec![rest] },
                awaiting_fence: rest.is_empty(),
            };
        }

        let trimmed = line.trim();
        if trimmed == "---" || trimmed.starts_with('#') {
            self.finish_section(state);
            return ScanState::Idle;
        }

        match state {
            ScanState::Section {
                label,
                mut lines,
                awaiting_fence,
            } => {
                let blank = trimmed.is_empty();
                lines.push(line);
                ScanState::Section {
                    label,
                    lines,
                    awaiting_fence: awaiting_fence && blank,
                }
            },
            other => other,
        }
    }

    fn finish_section(&mut self, state: ScanState<'_>) {
        if let ScanState::Section { label, lines, .. } = state {
            let text = lines.join("\n").trim().to_string();
            self.sections.entry(label).or_insert(text);
        }
    }

    fn finish_fence(&mut self, label: Option<String>, lines: &[&str]) {
        let Some(label) = label else {
            return;
        };
        let body: Vec<&str> = lines
            .iter()
            .copied()
            .skip_while(|line| line.trim().is_empty())
            .collect();
        let code = body.join("\n").trim_end().to_string();
        self.code_blocks.entry(label).or_insert(code);
    }

    /// Metadata value for `key` (any case, spaces allowed).
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(&normalize_key(key)).map(String::as_str)
    }

    /// Free-text section following `**label:**`, empty when absent.
    pub fn section(&self, label: &str) -> &str {
        self.sections
            .get(&normalize_key(label))
            .map_or("", String::as_str)
    }

    /// Fenced code following an otherwise empty `**label:**` line.
    pub fn code(&self, label: &str) -> Option<&str> {
        self.code_blocks.get(&normalize_key(label)).map(String::as_str)
    }

    /// Parses the `timestamp` field.
    ///
    /// A missing field yields the epoch sentinel; an unparseable one is
    /// reported as `Err` with the raw text so the caller can drop the block.
    pub fn timestamp(&self) -> Result<DateTime<Utc>, String> {
        match self.metadata("timestamp") {
            None => Ok(crate::Entry::EPOCH),
            Some(raw) => parse_timestamp(raw).ok_or_else(|| raw.to_string()),
        }
    }

    /// Parses a non-negative integer field, defaulting to 0.
    pub fn count(&self, key: &str) -> u32 {
        self.metadata(key).map_or(0, |raw| {
            raw.parse::<u32>().unwrap_or_else(|_| {
                tracing::warn!(field = key, value = raw, "Invalid integer, using 0");
                0
            })
        })
    }

    /// Parses the comma-separated `tags` field.
    pub fn tags(&self) -> Vec<String> {
        self.metadata("tags").map(parse_tags).unwrap_or_default()
    }

    /// Metadata value or empty string.
    pub fn text(&self, key: &str) -> String {
        self.metadata(key).unwrap_or_default().to_string()
    }
}

/// Splits a comma-separated tag list, stripping whitespace and backticks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim_matches(|c: char| c.is_whitespace() || c == '`'))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 timestamp, treating zone-less values as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case("2025-01-15T10:30:00Z" ; "zulu")]
    #[test_case("2025-01-15T10:30:00+00:00" ; "explicit offset")]
    #[test_case("2025-01-15T12:30:00+02:00" ; "non utc offset")]
    #[test_case("2025-01-15T10:30:00" ; "naive")]
    #[test_case("2025-01-15 10:30:00" ; "naive with space")]
    fn test_parse_timestamp_variants(raw: &str) {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).single();
        assert_eq!(parse_timestamp(raw), expected);
    }

    #[test]
    fn test_parse_timestamp_date_only_and_invalid() {
        let midnight = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single();
        assert_eq!(parse_timestamp("2025-01-15"), midnight);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_parse_tags_strips_backticks() {
        assert_eq!(
            parse_tags("`docker`, python ,, `file-io`"),
            ["docker", "python", "file-io"]
        );
    }

    #[test]
    fn test_label_line() {
        assert_eq!(
            parse_label_line("**Error Type:** `TypeError`"),
            Some(("error_type".to_string(), "`TypeError`"))
        );
        assert_eq!(
            parse_label_line("**Timestamp:** 2025-01-01T12:00:00Z"),
            Some(("timestamp".to_string(), "2025-01-01T12:00:00Z"))
        );
        assert_eq!(parse_label_line("> **Note**: header"), None);
        assert_eq!(parse_label_line("plain text"), None);
    }

    #[test]
    fn test_scan_metadata_sections_and_code() {
        let body = "\
**Timestamp:** 2025-01-01T12:00:00Z
**File:** `src/app.py`
**Success Count:** 3

**Fix Applied:**
```python
x = int(value)
```

**Explanation:** The value was a string.
It needed converting.

---";
        let lines: Vec<&str> = body.lines().collect();
        let fields = BlockFields::scan(&lines);

        assert_eq!(fields.metadata("file"), Some("src/app.py"));
        assert_eq!(fields.count("success count"), 3);
        assert_eq!(fields.code("fix applied"), Some("x = int(value)"));
        assert_eq!(
            fields.section("explanation"),
            "The value was a string.\nIt needed converting."
        );
        assert!(fields.timestamp().is_ok());
    }

    #[test]
    fn test_scan_ignores_labels_inside_fences() {
        let body = "**Code:**\n```\n**Result:** fake\n```\n**Result:** real";
        let lines: Vec<&str> = body.lines().collect();
        let fields = BlockFields::scan(&lines);
        assert_eq!(fields.metadata("result"), Some("real"));
        assert_eq!(fields.code("code"), Some("**Result:** fake"));
    }

    #[test]
    fn test_scan_multiline_section_after_empty_label() {
        let body = "**Issue Description:**\nThe agent forgot.\n\n**Rule Established:**\nAlways check.\n**Result:** ✅ Documented";
        let lines: Vec<&str> = body.lines().collect();
        let fields = BlockFields::scan(&lines);
        assert_eq!(fields.section("issue description"), "The agent forgot.");
        assert_eq!(fields.section("rule established"), "Always check.");
        assert!(fields.code("rule established").is_none());
    }

    #[test]
    fn test_invalid_count_defaults_to_zero() {
        let lines = vec!["**Success Count:** many"];
        assert_eq!(BlockFields::scan(&lines).count("success_count"), 0);
    }

    #[test]
    fn test_split_blocks_skips_fenced_headings() {
        let text = "preamble\n## A\n```\n## not a heading\n```\n## B\nbody";
        let blocks = split_blocks(text, |line| line.strip_prefix("## "));
        let heads: Vec<&str> = blocks.iter().map(|b| b.head).collect();
        assert_eq!(heads, ["A", "B"]);
        assert_eq!(blocks[0].lines.len(), 3);
    }

    #[test]
    fn test_longer_fence_contains_shorter_fence() {
        let body = "**Code:**\n````\n```\ninner\n```\n````";
        let lines: Vec<&str> = body.lines().collect();
        let fields = BlockFields::scan(&lines);
        assert_eq!(fields.code("code"), Some("```\ninner\n```"));
    }
}
