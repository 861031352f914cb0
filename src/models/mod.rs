//! Data models for errfix.
//!
//! Entries, per-project groupings and run summaries shared by every stage.

mod consolidation;
mod entry;
mod rule;

pub use consolidation::{ConsolidationResult, ProjectEntries};
pub use entry::{Entry, EntryBuilder, EntryKind, IdentityKey, SOLVED_MARKER};
pub use rule::{ProcessRule, truncate_chars};
