//! Session log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Glyph that marks a result as solved.
pub const SOLVED_MARKER: &str = "✅";

/// The two disjoint kinds of log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A `### Error:` block destined for the fix repository.
    #[default]
    Error,
    /// A `### Agent Process Issue:` block destined for the coding tips.
    ProcessIssue,
}

impl EntryKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::ProcessIssue => "process_issue",
        }
    }

    /// Label used after `### ` in a raw session log.
    #[must_use]
    pub const fn header_label(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::ProcessIssue => "Agent Process Issue",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact-match identity of an entry: signature, type and file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Error signature.
    pub signature: String,
    /// Error type.
    pub error_type: String,
    /// File path, empty for process issues.
    pub file: String,
}

/// One error or process-issue occurrence.
///
/// Entries are values: every merge, tag or consolidation step builds a new
/// `Entry` through [`Entry::to_builder`] rather than mutating one in place.
/// Tags are kept sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    kind: EntryKind,
    error_signature: String,
    error_type: String,
    file: String,
    line: u32,
    fix_code: String,
    explanation: String,
    result: String,
    success_count: u32,
    tags: Vec<String>,
    timestamp: DateTime<Utc>,
}

impl Entry {
    /// Timestamp used when a block carries none.
    pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

    /// Starts building an `### Error:` entry.
    #[must_use]
    pub fn error(signature: impl Into<String>) -> EntryBuilder {
        EntryBuilder::new(EntryKind::Error, signature)
    }

    /// Starts building an `### Agent Process Issue:` entry.
    #[must_use]
    pub fn process_issue(signature: impl Into<String>) -> EntryBuilder {
        EntryBuilder::new(EntryKind::ProcessIssue, signature)
    }

    /// Returns a builder seeded with every field of this entry.
    #[must_use]
    pub fn to_builder(&self) -> EntryBuilder {
        EntryBuilder {
            entry: self.clone(),
        }
    }

    /// Returns a copy with the tag set replaced.
    #[must_use]
    pub fn with_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to_builder().tags(tags).build()
    }

    /// Entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Whether this is an agent process issue.
    #[must_use]
    pub fn is_process_issue(&self) -> bool {
        self.kind == EntryKind::ProcessIssue
    }

    /// Error signature, the primary grouping key.
    #[must_use]
    pub fn error_signature(&self) -> &str {
        &self.error_signature
    }

    /// Error type or issue type.
    #[must_use]
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    /// File path, possibly empty.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Line number, 0 when unknown.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Fix code, or the established rule for process issues.
    #[must_use]
    pub fn fix_code(&self) -> &str {
        &self.fix_code
    }

    /// Free-text explanation.
    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Result line, conventionally prefixed with a glyph.
    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    /// How often this fix has worked.
    #[must_use]
    pub const fn success_count(&self) -> u32 {
        self.success_count
    }

    /// Sorted, unique tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// When the entry was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the result carries the solved glyph.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.result.contains(SOLVED_MARKER)
    }

    /// Identity used by exact deduplication.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            signature: self.error_signature.clone(),
            error_type: self.error_type.clone(),
            file: self.file.clone(),
        }
    }
}

/// Builder for [`Entry`].
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    entry: Entry,
}

impl EntryBuilder {
    /// Creates a builder with every optional field at its default.
    #[must_use]
    pub fn new(kind: EntryKind, signature: impl Into<String>) -> Self {
        Self {
            entry: Entry {
                kind,
                error_signature: signature.into(),
                error_type: String::new(),
                file: String::new(),
                line: 0,
                fix_code: String::new(),
                explanation: String::new(),
                result: String::new(),
                success_count: 0,
                tags: Vec::new(),
                timestamp: Entry::EPOCH,
            },
        }
    }

    /// Sets the error signature.
    #[must_use]
    pub fn error_signature(mut self, signature: impl Into<String>) -> Self {
        self.entry.error_signature = signature.into();
        self
    }

    /// Sets the error type.
    #[must_use]
    pub fn error_type(mut self, error_type: impl Into<String>) -> Self {
        self.entry.error_type = error_type.into();
        self
    }

    /// Sets the file path.
    #[must_use]
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.entry.file = file.into();
        self
    }

    /// Sets the line number.
    #[must_use]
    pub const fn line(mut self, line: u32) -> Self {
        self.entry.line = line;
        self
    }

    /// Sets the fix code.
    #[must_use]
    pub fn fix_code(mut self, fix_code: impl Into<String>) -> Self {
        self.entry.fix_code = fix_code.into();
        self
    }

    /// Sets the explanation.
    #[must_use]
    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.entry.explanation = explanation.into();
        self
    }

    /// Sets the result line.
    #[must_use]
    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.entry.result = result.into();
        self
    }

    /// Sets the success count.
    #[must_use]
    pub const fn success_count(mut self, count: u32) -> Self {
        self.entry.success_count = count;
        self
    }

    /// Replaces the tag set.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.entry.timestamp = timestamp;
        self
    }

    /// Finishes the entry, normalizing the tag set.
    #[must_use]
    pub fn build(self) -> Entry {
        let mut entry = self.entry;
        entry.tags = normalize_tag_set(std::mem::take(&mut entry.tags));
        entry
    }
}

fn normalize_tag_set(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_defaults() {
        let entry = Entry::error("TypeError: bad operand").build();
        assert_eq!(entry.kind(), EntryKind::Error);
        assert!(!entry.is_process_issue());
        assert_eq!(entry.line(), 0);
        assert_eq!(entry.success_count(), 0);
        assert!(entry.fix_code().is_empty());
        assert_eq!(entry.timestamp(), Entry::EPOCH);
    }

    #[test]
    fn test_tags_sorted_and_unique() {
        let entry = Entry::error("sig")
            .tags(["python", " docker ", "python", ""])
            .build();
        assert_eq!(entry.tags(), ["docker", "python"]);
    }

    #[test]
    fn test_to_builder_produces_new_value() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single();
        let original = Entry::error("sig")
            .error_type("KeyError")
            .success_count(2)
            .timestamp(ts.unwrap_or(Entry::EPOCH))
            .build();
        let updated = original.to_builder().success_count(5).build();

        assert_eq!(original.success_count(), 2);
        assert_eq!(updated.success_count(), 5);
        assert_eq!(updated.error_type(), "KeyError");
        assert_eq!(updated.timestamp(), original.timestamp());
    }

    #[test]
    fn test_identity_key() {
        let a = Entry::error("sig").error_type("T").file("a.py").build();
        let b = Entry::error("sig")
            .error_type("T")
            .file("a.py")
            .fix_code("other")
            .build();
        let c = Entry::error("sig").error_type("T").file("b.py").build();
        assert_eq!(a.identity_key(), b.identity_key());
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_is_solved() {
        assert!(Entry::error("s").result("✅ Solved").build().is_solved());
        assert!(!Entry::error("s").result("❌ Failed").build().is_solved());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EntryKind::Error.header_label(), "Error");
        assert_eq!(EntryKind::ProcessIssue.header_label(), "Agent Process Issue");
        assert_eq!(EntryKind::ProcessIssue.to_string(), "process_issue");
    }
}
