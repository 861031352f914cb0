//! Per-project paths, bootstrap and log clearing.

use super::writer::write_atomic;
use crate::rendering::{generate_coding_tips_markdown, generate_fix_repo_markdown};
use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory holding a project's knowledge base.
pub const ERRORS_DIR: &str = ".errors_fixes";
/// Append-only session log.
pub const SESSION_LOG_FILE: &str = "errors_and_fixes.md";
/// Generated fix repository.
pub const FIX_REPO_FILE: &str = "fix_repo.md";
/// Generated coding tips.
pub const CODING_TIPS_FILE: &str = "coding_tips.md";

/// Text a cleared session log keeps.
pub const LOG_HEADER: &str = "# Errors and Fixes Log

> **Note**: This file is processed daily by the consolidation app at 2 AM.
> `### Error:` entries → fix_repo.md; `### Agent Process Issue:` entries → coding_tips.md. Contents are then cleared (file is kept).

";

/// Resolved knowledge-base paths of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Paths for the project rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.errors_fixes`.
    #[must_use]
    pub fn errors_dir(&self) -> PathBuf {
        self.root.join(ERRORS_DIR)
    }

    /// `<root>/.errors_fixes/errors_and_fixes.md`.
    #[must_use]
    pub fn session_log(&self) -> PathBuf {
        self.errors_dir().join(SESSION_LOG_FILE)
    }

    /// `<root>/.errors_fixes/fix_repo.md`.
    #[must_use]
    pub fn fix_repo(&self) -> PathBuf {
        self.errors_dir().join(FIX_REPO_FILE)
    }

    /// `<root>/.errors_fixes/coding_tips.md`.
    #[must_use]
    pub fn coding_tips(&self) -> PathBuf {
        self.errors_dir().join(CODING_TIPS_FILE)
    }

    /// Whether the session log exists.
    #[must_use]
    pub fn has_session_log(&self) -> bool {
        self.session_log().is_file()
    }
}

/// Reads `path`, treating a missing file as `None`.
///
/// # Errors
///
/// Returns [`Error::Io`] for any failure other than the file not existing.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Creates `.errors_fixes/` with header-only files where they are missing.
///
/// Existing files are never overwritten. Returns the files it created.
///
/// # Errors
///
/// Returns [`Error::Io`] when the directory or a file cannot be written.
pub fn bootstrap_project(root: &Path) -> Result<Vec<PathBuf>> {
    let paths = ProjectPaths::new(root);
    let documents = [
        (paths.session_log(), LOG_HEADER.to_string()),
        (paths.fix_repo(), generate_fix_repo_markdown(&[])),
        (paths.coding_tips(), generate_coding_tips_markdown(&[])),
    ];

    let mut created = Vec::new();
    for (path, contents) in documents {
        if path.exists() {
            continue;
        }
        write_atomic(&path, &contents)?;
        created.push(path);
    }

    if !created.is_empty() {
        tracing::info!(project = %root.display(), files = created.len(), "Bootstrapped project");
    }
    Ok(created)
}

/// Replaces the session log with [`LOG_HEADER`].
///
/// A missing log is left missing.
///
/// # Errors
///
/// Returns [`Error::Io`] when the log cannot be rewritten.
pub fn clear_log(root: &Path) -> Result<()> {
    let log = ProjectPaths::new(root).session_log();
    if !log.exists() {
        tracing::warn!(path = %log.display(), "Session log missing, nothing to clear");
        return Ok(());
    }
    write_atomic(&log, LOG_HEADER)?;
    tracing::info!(project = %root.display(), "Cleared session log");
    Ok(())
}
