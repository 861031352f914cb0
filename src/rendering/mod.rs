//! Markdown rendering for the generated knowledge-base documents.

mod generator;
pub mod markdown;

pub use generator::{
    CODING_TIPS_TITLE, FIX_REPO_TITLE, GENERAL_CATEGORY, PROCESS_RULES_TITLE, category_of,
    generate_coding_tips_markdown, generate_fix_repo_markdown, render_process_rules,
};
pub use markdown::{escape_markdown, unescape_markdown};
