//! Consolidation run types.

use super::Entry;
use std::path::PathBuf;

/// Entries parsed from one project's session log, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectEntries {
    /// Project root the entries were read from.
    pub project: PathBuf,
    /// `### Error:` entries in document order.
    pub errors: Vec<Entry>,
    /// `### Agent Process Issue:` entries in document order.
    pub process_issues: Vec<Entry>,
}

impl ProjectEntries {
    /// Partitions `entries` by kind, preserving order within each kind.
    #[must_use]
    pub fn from_entries(project: impl Into<PathBuf>, entries: Vec<Entry>) -> Self {
        let (process_issues, errors) = entries.into_iter().partition(Entry::is_process_issue);
        Self {
            project: project.into(),
            errors,
            process_issues,
        }
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len() + self.process_issues.len()
    }

    /// Whether no entries were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.process_issues.is_empty()
    }
}

/// Summary of one consolidation run across all discovered projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationResult {
    /// Projects consolidated successfully.
    pub ok_count: usize,
    /// Projects that failed, plus one for a failed discovery.
    pub fail_count: usize,
    /// Projects skipped because they had no session log.
    pub skipped_count: usize,
}

impl ConsolidationResult {
    /// True iff nothing failed.
    #[must_use]
    pub const fn all_ok(&self) -> bool {
        self.fail_count == 0
    }

    /// A run that failed before any project was processed.
    #[must_use]
    pub const fn aborted() -> Self {
        Self {
            ok_count: 0,
            fail_count: 1,
            skipped_count: 0,
        }
    }
}
