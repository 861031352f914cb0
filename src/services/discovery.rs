//! Project discovery.
//!
//! A project is any directory holding `.errors_fixes/errors_and_fixes.md`.
//! Discovery checks the root itself and its immediate subdirectories (not
//! recursively), then any extra paths configured outside the root.

use crate::storage::{ProjectPaths, bootstrap_project};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Traversal fragments that disqualify an extra project path.
const SUSPICIOUS_PATTERNS: &[&str] = &["../..", "/../"];

/// Finds the projects a consolidation run should visit.
pub trait ProjectDiscovery {
    /// Returns project roots in processing order, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] when `root` is missing or not a
    /// directory.
    fn discover(&self, root: &Path, extra: &[PathBuf]) -> Result<Vec<PathBuf>>;
}

/// Discovery over the local filesystem.
///
/// Extra paths whose session log is missing are bootstrapped so they can
/// start collecting entries.
#[derive(Debug, Clone, Copy)]
pub struct FilesystemDiscovery {
    bootstrap_extras: bool,
}

impl Default for FilesystemDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesystemDiscovery {
    /// Creates a discovery that bootstraps extra projects.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bootstrap_extras: true,
        }
    }

    /// Sets whether extra projects without a session log are bootstrapped
    /// or skipped.
    #[must_use]
    pub const fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap_extras = enabled;
        self
    }

    fn scan_root(root: &Path, found: &mut Vec<PathBuf>) {
        if ProjectPaths::new(root).has_session_log() {
            tracing::debug!(project = %root.display(), "Root is itself a project");
            found.push(resolve(root));
        }

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Cannot list projects root");
                return;
            },
        };
        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        let checked = subdirs.len();
        for dir in subdirs {
            if ProjectPaths::new(&dir).has_session_log() {
                found.push(resolve(&dir));
            } else {
                tracing::trace!(dir = %dir.display(), "No session log, not a project");
            }
        }
        tracing::info!(
            root = %root.display(),
            checked,
            found = found.len(),
            "Scanned projects root"
        );
    }

    fn add_extra(&self, extra: &Path, found: &mut Vec<PathBuf>) {
        if !is_safe_extra_path(extra) {
            tracing::warn!(path = %extra.display(), "Rejecting suspicious extra project path");
            return;
        }
        if !extra.exists() {
            tracing::warn!(path = %extra.display(), "Extra project path does not exist, skipping");
            return;
        }
        if !extra.is_dir() {
            tracing::warn!(path = %extra.display(), "Extra project path is not a directory, skipping");
            return;
        }

        if !ProjectPaths::new(extra).has_session_log() {
            if !self.bootstrap_extras {
                tracing::warn!(path = %extra.display(), "Extra project has no session log, skipping");
                return;
            }
            if let Err(e) = bootstrap_project(extra) {
                tracing::warn!(path = %extra.display(), error = %e, "Could not bootstrap extra project, skipping");
                return;
            }
        }
        found.push(resolve(extra));
    }
}

impl ProjectDiscovery for FilesystemDiscovery {
    #[instrument(skip(self, extra), fields(root = %root.display(), extra = extra.len()))]
    fn discover(&self, root: &Path, extra: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::Discovery(format!(
                "projects root does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(Error::Discovery(format!(
                "projects root is not a directory: {}",
                root.display()
            )));
        }

        let mut found = Vec::new();
        Self::scan_root(root, &mut found);
        for path in extra {
            self.add_extra(path, &mut found);
        }

        let mut seen = HashSet::new();
        found.retain(|path| seen.insert(path.clone()));
        Ok(found)
    }
}

/// Whether an extra project path is non-empty and free of `../..`-style
/// traversal.
#[must_use]
pub fn is_safe_extra_path(path: &Path) -> bool {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.trim().is_empty() {
        return false;
    }
    !SUSPICIOUS_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use tempfile::TempDir;

    fn make_project(dir: &Path) {
        bootstrap_project(dir).expect("bootstrap");
    }

    fn canonical(path: &Path) -> PathBuf {
        fs::canonicalize(path).expect("canonicalize")
    }

    #[test_case("projects/app", true ; "plain relative")]
    #[test_case("/abs/app", true ; "absolute")]
    #[test_case("../app", true ; "single parent")]
    #[test_case("../../etc", false ; "double parent")]
    #[test_case("/home/../root", false ; "embedded parent")]
    #[test_case(r"..\..\win", false ; "backslash traversal")]
    #[test_case("", false ; "empty")]
    #[test_case("   ", false ; "blank")]
    fn test_is_safe_extra_path(path: &str, expected: bool) {
        assert_eq!(is_safe_extra_path(Path::new(path)), expected);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = FilesystemDiscovery::new()
            .discover(&dir.path().join("nope"), &[])
            .expect_err("missing root");
        assert!(matches!(err, Error::Discovery(_)));
    }

    #[test]
    fn test_file_root_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("file");
        fs::write(&file, "x").expect("write");
        assert!(FilesystemDiscovery::new().discover(&file, &[]).is_err());
    }

    #[test]
    fn test_finds_root_and_sorted_subdirectories() {
        let dir = TempDir::new().expect("tempdir");
        make_project(dir.path());
        for name in ["zeta", "alpha", "mid"] {
            make_project(&dir.path().join(name));
        }
        fs::create_dir(dir.path().join("not-a-project")).expect("mkdir");

        let found = FilesystemDiscovery::new().discover(dir.path(), &[]).expect("discover");
        let expected: Vec<PathBuf> = [dir.path().to_path_buf()]
            .into_iter()
            .chain(["alpha", "mid", "zeta"].map(|n| dir.path().join(n)))
            .map(|p| canonical(&p))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_subdirectories_are_not_recursed() {
        let dir = TempDir::new().expect("tempdir");
        make_project(&dir.path().join("outer").join("inner"));
        let found = FilesystemDiscovery::new().discover(dir.path(), &[]).expect("discover");
        assert!(found.is_empty());
    }

    #[test]
    fn test_extra_projects_bootstrapped_and_deduplicated() {
        let root = TempDir::new().expect("root");
        make_project(&root.path().join("app"));
        let outside = TempDir::new().expect("outside");

        let extra = vec![
            outside.path().to_path_buf(),
            root.path().join("app"),
            outside.path().join("missing"),
        ];
        let found = FilesystemDiscovery::new().discover(root.path(), &extra).expect("discover");

        assert_eq!(found, [canonical(&root.path().join("app")), canonical(outside.path())]);
        assert!(ProjectPaths::new(outside.path()).has_session_log());
    }

    #[test]
    fn test_extra_without_bootstrap_is_skipped() {
        let root = TempDir::new().expect("root");
        let outside = TempDir::new().expect("outside");
        let found = FilesystemDiscovery::new()
            .with_bootstrap(false)
            .discover(root.path(), &[outside.path().to_path_buf()])
            .expect("discover");
        assert!(found.is_empty());
        assert!(!ProjectPaths::new(outside.path()).errors_dir().exists());
    }
}
