//! Deduplication result types.

use crate::models::Entry;
use std::fmt;

/// What happened to one incoming entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupOutcome {
    /// Folded into a matching entry with the same fix.
    Merged,
    /// Kept beside a matching entry whose fix differs.
    Variant,
    /// No matching entry; appended as new.
    Appended,
}

impl DedupOutcome {
    /// Returns the outcome label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Variant => "variant",
            Self::Appended => "appended",
        }
    }
}

impl fmt::Display for DedupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Entries merged into an existing one.
    pub merged: usize,
    /// Entries kept as variants.
    pub variants: usize,
    /// Entries appended as new.
    pub appended: usize,
    /// Language-model comparisons that failed.
    pub llm_failures: usize,
}

impl DedupStats {
    /// Counts one outcome.
    pub fn record(&mut self, outcome: DedupOutcome) {
        match outcome {
            DedupOutcome::Merged => self.merged += 1,
            DedupOutcome::Variant => self.variants += 1,
            DedupOutcome::Appended => self.appended += 1,
        }
        metrics::counter!("errfix_dedup_outcomes_total", "outcome" => outcome.as_str())
            .increment(1);
    }
}

/// Merges a batch of new entries into existing ones.
pub trait Deduplicator {
    /// Returns `existing` with every entry of `new` merged, kept as a
    /// variant, or appended.
    fn deduplicate(&self, new: &[Entry], existing: &[Entry]) -> Vec<Entry>;
}
