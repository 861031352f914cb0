//! Tag enrichment.
//!
//! A [`Tagger`] generates tags for an entry; applying it never removes a tag
//! the entry already carries. [`RuleBasedTagger`] reads fixed pattern
//! tables, [`AiTagger`] asks the language model and falls back to the rules.

mod ai;
mod rules;

pub use ai::{AiTagger, MAX_TAGS, MIN_TAGS, normalize_tag, parse_tags_response};
pub use rules::{RuleBasedTagger, generate_tags_rule_based};

use crate::Result;
use crate::models::Entry;

/// Generates tags for entries.
pub trait Tagger {
    /// Tags generated for `entry`, excluding the ones it already has.
    ///
    /// # Errors
    ///
    /// Returns an error when generation fails and no fallback applies.
    fn generate(&self, entry: &Entry) -> Result<Vec<String>>;

    /// Returns a copy of `entry` whose tags are its own plus the generated
    /// ones.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`Tagger::generate`].
    fn apply(&self, entry: &Entry) -> Result<Entry> {
        Ok(with_added_tags(entry, self.generate(entry)?))
    }
}

/// Unions `generated` into the tag set of `entry`.
#[must_use]
pub fn with_added_tags(entry: &Entry, generated: Vec<String>) -> Entry {
    let mut tags = entry.tags().to_vec();
    tags.extend(generated);
    entry.with_tags(tags)
}
