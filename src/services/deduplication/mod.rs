//! Entry deduplication.
//!
//! Two strategies fold freshly parsed entries into the entries already in a
//! project's documents:
//!
//! - **Exact**: entries sharing an [`IdentityKey`](crate::models::IdentityKey)
//!   and an equivalent fix are merged; a different fix is kept as a variant.
//! - **Semantic**: a language model scores each pair and the best match at or
//!   above the similarity threshold absorbs the entry.
//!
//! Both return existing entries first, in their original order, followed by
//! entries that matched nothing, in input order.
//!
//! # Example
//!
//! ```rust,ignore
//! use errfix::services::deduplication::{Deduplicator, ExactMatchDeduplicator};
//!
//! let merged = ExactMatchDeduplicator::new().deduplicate(&parsed, &existing);
//! ```

mod config;
mod exact_match;
mod semantic;
mod types;

pub use config::{DEFAULT_SIMILARITY_THRESHOLD, DeduplicationConfig};
pub use exact_match::{ExactMatchDeduplicator, dedupe_exact, fix_codes_match, merge_entries};
pub use semantic::{SemanticDeduplicator, SimilarityScore, parse_similarity};
pub use types::{DedupOutcome, DedupStats, Deduplicator};
