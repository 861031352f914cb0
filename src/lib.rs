//! # errfix
//!
//! Consolidates the per-project session logs written by coding agents into
//! two durable knowledge bases.
//!
//! Every project keeps an append-only `.errors_fixes/errors_and_fixes.md`.
//! A consolidation run parses that log, merges the new entries into the
//! project's `fix_repo.md` (solutions grouped by error signature) and
//! `coding_tips.md` (agent process rules), regenerates both documents
//! deterministically and clears the log back to its header.
//!
//! ## Pipeline
//!
//! - [`parser`] turns raw logs and previously generated documents into [`Entry`] values
//! - [`services::deduplication`] merges entries by identity key or by LLM-scored similarity
//! - [`services::merger`] folds near-identical fix variants together
//! - [`services::tagging`] enriches tags from static tables or an LLM
//! - [`services::rule_extractor`] distills process rules from process issues
//! - [`rendering`] produces the markdown documents
//! - [`storage`] writes them atomically and clears the log
//! - [`services::ConsolidationService`] runs the whole sweep across discovered projects
//!
//! ## Example
//!
//! ```rust,ignore
//! use errfix::services::{ConsolidationOptions, ConsolidationService, FilesystemDiscovery};
//!
//! let discovery = FilesystemDiscovery::new();
//! let service = ConsolidationService::new(ConsolidationOptions::default());
//! let result = service.consolidate(&discovery, "/home/me/projects".as_ref(), &[], false);
//! assert!(result.all_ok());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod config;
pub mod llm;
pub mod models;
pub mod observability;
pub mod parser;
pub mod rendering;
pub mod services;
pub mod storage;

pub use config::{ConsolidationConfig, DedupStrategy};
pub use llm::{LlmError, LlmProvider, LlmTask};
pub use models::{ConsolidationResult, Entry, EntryKind, IdentityKey, ProcessRule, ProjectEntries};
pub use services::{ConsolidationOptions, ConsolidationService, FilesystemDiscovery, ProjectDiscovery};

/// Error type for errfix operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Bad threshold, malformed cron expression, unsafe extra path |
/// | `OperationFailed` | Configuration loading, AI fallbacks disabled and the model failed |
/// | `Io` | Reading a log, writing a document, renaming the temp file |
/// | `Discovery` | Projects root missing or not a directory |
/// | `Llm` | Language-model call failed and no fallback applied |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Filesystem error tied to a concrete path.
    ///
    /// Raised when:
    /// - A session log or existing document cannot be read
    /// - The `.errors_fixes` directory cannot be created
    /// - The temp file cannot be written or renamed over its destination
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Project discovery could not start.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The language-model collaborator failed.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl Error {
    /// Builds an [`Error::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for errfix operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("threshold".to_string());
        assert_eq!(err.to_string(), "invalid input: threshold");

        let err = Error::OperationFailed {
            operation: "load_config".to_string(),
            cause: "bad toml".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'load_config' failed: bad toml");

        let err = Error::Discovery("root missing".to_string());
        assert_eq!(err.to_string(), "discovery failed: root missing");
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "/tmp/fix_repo.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = err.to_string();
        assert!(display.contains("/tmp/fix_repo.md"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_llm_error_is_transparent() {
        let err: Error = LlmError::Timeout("30s".to_string()).into();
        assert_eq!(err.to_string(), LlmError::Timeout("30s".to_string()).to_string());
    }
}
