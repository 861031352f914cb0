//! Atomic file replacement.

use crate::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Sibling temporary path used while replacing `path`.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` to `path` through a sibling temporary file.
///
/// The parent directory is created when missing. Readers of `path` see
/// either the old contents or the new ones; on failure the temporary file is
/// removed and `path` is left untouched.
///
/// # Errors
///
/// Returns [`Error::Io`] naming the path that could not be created, written
/// or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    write_all_atomic(&[(path, contents)])
}

/// Replaces several files together.
///
/// Every temporary file is written before the first rename, so a failure
/// while writing leaves all destinations untouched.
///
/// # Errors
///
/// Returns [`Error::Io`] naming the path that could not be created, written
/// or renamed.
pub fn write_all_atomic(files: &[(&Path, &str)]) -> Result<()> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    let outcome = files
        .iter()
        .try_for_each(|&(path, contents)| {
            let temp = stage(path, contents)?;
            staged.push(temp);
            Ok(())
        })
        .and_then(|()| {
            files.iter().zip(&staged).try_for_each(|(&(path, _), temp)| {
                fs::rename(temp, path).map_err(|e| Error::io(path, e))
            })
        });

    match &outcome {
        Err(e) => {
            for temp in files.iter().map(|&(path, _)| temp_path(path)) {
                if temp.is_file() {
                    let _ = fs::remove_file(&temp);
                }
            }
            tracing::error!(error = %e, "Atomic write failed");
        },
        Ok(()) => {
            for &(path, contents) in files {
                tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
            }
        },
    }
    outcome
}

fn stage(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let temp = temp_path(path);
    fs::write(&temp, contents).map_err(|e| Error::io(&temp, e))?;
    Ok(temp)
}
