//! Business logic services.
//!
//! Each stage of the consolidation pipeline is a service of its own; the
//! [`ConsolidationService`] composes them per project.

mod consolidation;
pub mod deduplication;
mod discovery;
pub mod merger;
pub mod rule_extractor;
pub mod tagging;

pub use consolidation::{ConsolidationOptions, ConsolidationService, ProjectOutcome};
pub use discovery::{FilesystemDiscovery, ProjectDiscovery, is_safe_extra_path};
pub use rule_extractor::RuleExtractor;
