//! Exact match deduplication.
//!
//! Entries match when their identity keys (signature, type, file) are
//! equal. A match with the same fix, compared after whitespace
//! normalization, is merged; a match with a different fix is kept as a
//! variant beside it.

use crate::models::{Entry, IdentityKey};
use std::collections::HashMap;
use tracing::instrument;

use super::types::{DedupOutcome, DedupStats, Deduplicator};

/// Deduplicator that matches on identity keys only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchDeduplicator;

impl ExactMatchDeduplicator {
    /// Creates a new exact match deduplicator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Deduplicator for ExactMatchDeduplicator {
    fn deduplicate(&self, new: &[Entry], existing: &[Entry]) -> Vec<Entry> {
        dedupe_exact(new, existing)
    }
}

/// Deduplicates `new` against `existing` and against each other.
///
/// `existing` is folded through the same lookup first, so the output keeps
/// the order of `existing` followed by appended entries and applying the
/// function to its own output changes nothing.
#[instrument(skip_all, fields(new = new.len(), existing = existing.len()))]
pub fn dedupe_exact(new: &[Entry], existing: &[Entry]) -> Vec<Entry> {
    let mut consolidated = Consolidated::with_capacity(new.len() + existing.len());
    for entry in existing {
        consolidated.absorb(entry.clone());
    }

    let mut stats = DedupStats::default();
    for entry in new {
        stats.record(consolidated.absorb(entry.clone()));
    }

    tracing::debug!(
        merged = stats.merged,
        variants = stats.variants,
        appended = stats.appended,
        "Exact deduplication complete"
    );
    consolidated.into_entries()
}

/// Merges two entries that share an identity key and a fix.
///
/// Counts are summed, the later timestamp and the tag union are kept, a
/// solved result wins (the existing one first), and explanation and fix
/// code stay as they were unless empty. Signature, type, file and line come
/// from `existing`.
#[must_use]
pub fn merge_entries(existing: &Entry, new: &Entry) -> Entry {
    let result = if existing.is_solved() {
        existing.result()
    } else if new.is_solved() || existing.result().is_empty() {
        new.result()
    } else {
        existing.result()
    };

    existing
        .to_builder()
        .success_count(existing.success_count().saturating_add(new.success_count()))
        .timestamp(existing.timestamp().max(new.timestamp()))
        .tags(existing.tags().iter().chain(new.tags()).cloned())
        .result(result)
        .explanation(non_empty_or(existing.explanation(), new.explanation()))
        .fix_code(non_empty_or(existing.fix_code(), new.fix_code()))
        .build()
}

fn non_empty_or<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

/// Whether two fixes are the same once whitespace runs are collapsed.
///
/// Two empty fixes match; an empty and a non-empty one do not.
#[must_use]
pub fn fix_codes_match(first: &str, second: &str) -> bool {
    first.split_whitespace().eq(second.split_whitespace())
}

/// Consolidated entries plus an identity lookup over them.
///
/// The lookup maps every key to all indices carrying it, so a new entry is
/// compared with each variant before it is appended.
#[derive(Debug, Default)]
pub(crate) struct Consolidated {
    entries: Vec<Entry>,
    lookup: HashMap<IdentityKey, Vec<usize>>,
}

impl Consolidated {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Folds `entry` in by identity key.
    pub(crate) fn absorb(&mut self, entry: Entry) -> DedupOutcome {
        let key = entry.identity_key();
        let candidates = self.lookup.get(&key).map_or(&[][..], Vec::as_slice);
        let known = !candidates.is_empty();
        let same_fix = candidates
            .iter()
            .copied()
            .find(|&idx| fix_codes_match(self.entries[idx].fix_code(), entry.fix_code()));

        match same_fix {
            Some(idx) => {
                self.merge_at(idx, &entry);
                DedupOutcome::Merged
            },
            None if !known => {
                self.push(entry);
                DedupOutcome::Appended
            },
            None => {
                tracing::debug!(
                    signature = %entry.error_signature(),
                    "Keeping variant fix"
                );
                self.push(entry);
                DedupOutcome::Variant
            },
        }
    }

    /// Merges `entry` into the entry at `idx` when their fixes match,
    /// otherwise keeps it as a variant.
    pub(crate) fn merge_or_vary(&mut self, idx: usize, entry: Entry) -> DedupOutcome {
        if fix_codes_match(self.entries[idx].fix_code(), entry.fix_code()) {
            self.merge_at(idx, &entry);
            DedupOutcome::Merged
        } else {
            self.push(entry);
            DedupOutcome::Variant
        }
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.lookup
            .entry(entry.identity_key())
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
    }

    fn merge_at(&mut self, idx: usize, entry: &Entry) {
        let merged = merge_entries(&self.entries[idx], entry);
        tracing::debug!(
            signature = %merged.error_signature(),
            success_count = merged.success_count(),
            "Merged duplicate entry"
        );
        self.entries[idx] = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryBuilder;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn error(fix: &str, count: u32) -> EntryBuilder {
        Entry::error("FileNotFoundError: config.yaml")
            .error_type("FileNotFoundError")
            .file("app.py")
            .fix_code(fix)
            .success_count(count)
    }

    #[test]
    fn test_same_fix_is_merged() {
        let existing = [error("Path(p).resolve()", 3).build()];
        let new = [error("Path(p).resolve()", 2).build()];
        let out = dedupe_exact(&new, &existing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].success_count(), 5);
    }

    #[test]
    fn test_new_entries_merge_with_each_other() {
        let new = [error("fix()", 3).build(), error("fix()", 2).build()];
        let out = dedupe_exact(&new, &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].success_count(), 5);
    }

    #[test]
    fn test_different_fix_is_variant() {
        let existing = [error("a()", 1).build()];
        let new = [error("b()", 1).build()];
        let out = dedupe_exact(&new, &existing);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].fix_code(), "a()");
        assert_eq!(out[1].fix_code(), "b()");
    }

    #[test]
    fn test_returning_variant_merges_with_its_own_copy() {
        let existing = [error("a()", 1).build(), error("b()", 1).build()];
        let new = [error("b()", 4).build()];
        let out = dedupe_exact(&new, &existing);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].success_count(), 5);
    }

    #[test]
    fn test_different_file_is_a_new_entry() {
        let existing = [error("a()", 1).build()];
        let new = [error("a()", 1).file("other.py").build()];
        assert_eq!(dedupe_exact(&new, &existing).len(), 2);
    }

    #[test]
    fn test_output_keeps_existing_order_then_new() {
        let existing = [
            Entry::error("B").build(),
            Entry::error("A").build(),
        ];
        let new = [Entry::error("C").build(), Entry::error("A").build()];
        let signatures: Vec<String> = dedupe_exact(&new, &existing)
            .iter()
            .map(|e| e.error_signature().to_string())
            .collect();
        assert_eq!(signatures, ["B", "A", "C"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(dedupe_exact(&[], &[]).is_empty());
        let only = [error("x", 1).build()];
        assert_eq!(dedupe_exact(&[], &only), only);
        assert_eq!(dedupe_exact(&only, &[]), only);
    }

    #[test]
    fn test_merge_fields() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or(Entry::EPOCH);
        let late = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).single().unwrap_or(Entry::EPOCH);
        let existing = error("fix()", 1)
            .timestamp(late)
            .tags(["python"])
            .result("❌ Failed")
            .explanation("")
            .line(10)
            .build();
        let new = error("fix()", u32::MAX)
            .timestamp(early)
            .tags(["file-io", "python"])
            .result("✅ Solved")
            .explanation("Missing path")
            .line(20)
            .build();

        let merged = merge_entries(&existing, &new);
        assert_eq!(merged.success_count(), u32::MAX);
        assert_eq!(merged.timestamp(), late);
        assert_eq!(merged.tags(), ["file-io", "python"]);
        assert_eq!(merged.result(), "✅ Solved");
        assert_eq!(merged.explanation(), "Missing path");
        assert_eq!(merged.line(), 10);
    }

    #[test_case("✅ Solved", "✅ Also", "✅ Solved")]
    #[test_case("Pending", "✅ Solved", "✅ Solved")]
    #[test_case("Pending", "Retry", "Pending")]
    #[test_case("", "Retry", "Retry")]
    fn test_merge_result_preference(existing: &str, new: &str, expected: &str) {
        let merged = merge_entries(
            &error("f", 1).result(existing).build(),
            &error("f", 1).result(new).build(),
        );
        assert_eq!(merged.result(), expected);
    }

    #[test_case("", "", true)]
    #[test_case("", "x", false)]
    #[test_case("a  =\n 1", "a = 1", true)]
    #[test_case("  a = 1  ", "a = 1", true)]
    #[test_case("A = 1", "a = 1", false)]
    fn test_fix_codes_match(first: &str, second: &str, expected: bool) {
        assert_eq!(fix_codes_match(first, second), expected);
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let existing = [error("a()", 1).build(), error("a()", 2).build()];
        let new = [error("b()", 1).build(), error("a()", 3).build()];
        let once = dedupe_exact(&new, &existing);
        assert_eq!(dedupe_exact(&once, &[]), once);
        assert_eq!(once[0].success_count(), 6);
    }
}
