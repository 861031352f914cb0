//! On-disk layout of a project's knowledge base.
//!
//! Every project keeps three files under `.errors_fixes/`: the append-only
//! session log, the generated fix repository and the generated coding tips.
//! Generated files are replaced atomically; the session log is cleared back
//! to its header, never deleted.

mod project;
mod writer;

pub use project::{
    CODING_TIPS_FILE, ERRORS_DIR, FIX_REPO_FILE, LOG_HEADER, ProjectPaths, SESSION_LOG_FILE,
    bootstrap_project, clear_log, read_optional,
};
pub use writer::{temp_path, write_all_atomic, write_atomic};
