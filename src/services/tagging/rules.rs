//! Rule-based tagging from fixed pattern tables.

use super::Tagger;
use crate::Result;
use crate::models::{Entry, truncate_chars};
use std::collections::BTreeSet;

/// Exception type to domain tag.
const ERROR_TYPE_DOMAINS: &[(&str, &str)] = &[
    ("FileNotFoundError", "file-io"),
    ("PermissionError", "file-io"),
    ("IOError", "file-io"),
    ("OSError", "file-io"),
    ("TypeError", "type-conversion"),
    ("ValueError", "type-conversion"),
    ("AttributeError", "type-conversion"),
    ("KeyError", "data-structure"),
    ("IndexError", "data-structure"),
    ("ConnectionRefusedError", "networking"),
    ("ConnectionError", "networking"),
    ("TimeoutError", "networking"),
    ("ImportError", "imports"),
    ("ModuleNotFoundError", "imports"),
    ("SyntaxError", "syntax"),
    ("IndentationError", "syntax"),
    ("NameError", "syntax"),
    ("AssertionError", "testing"),
];

type PatternTable = &'static [(&'static str, &'static [&'static str])];

/// Frameworks and libraries, checked in order; patterns are lowercase.
const FRAMEWORK_PATTERNS: PatternTable = &[
    ("docker", &["docker", "docker-compose", "dockerfile", "container"]),
    ("django", &["django", "manage.py", "settings.py", "models.py", "views.py"]),
    ("flask", &["flask", "app.py", "blueprint"]),
    ("fastapi", &["fastapi", "uvicorn", "starlette"]),
    ("pytest", &["pytest", "conftest.py", "test_"]),
    ("react", &["react", "jsx", "tsx", "component"]),
    ("vue", &["vue", ".vue"]),
    ("postgres", &["postgres", "postgresql", "psycopg"]),
    ("mysql", &["mysql", "mysqldb", "pymysql"]),
    ("sqlite", &["sqlite", ".db", ".sqlite"]),
    ("redis", &["redis"]),
    ("celery", &["celery"]),
    ("sqlalchemy", &["sqlalchemy", "orm"]),
];

const DOMAIN_PATTERNS: PatternTable = &[
    ("networking", &["network", "socket", "http", "tcp", "udp", "connection", "connect"]),
    ("database", &["database", "db", "query", "sql", "migration", "schema"]),
    ("authentication", &["auth", "login", "password", "token", "session", "jwt"]),
    ("file-io", &["file", "read", "write", "open", "path", "directory", "folder"]),
    ("api", &["api", "endpoint", "route", "request", "response"]),
    ("testing", &["test", "spec", "fixture", "mock"]),
    ("logging", &["log", "logger", "debug", "trace"]),
    ("configuration", &["config", "settings", "env", "environment"]),
];

const PLATFORM_PATTERNS: PatternTable = &[
    ("windows", &["winerror", "windows", "win32", "\\", "c:\\", "d:\\"]),
    ("linux", &["linux", "/usr", "/var", "/etc", "posix"]),
    ("macos", &["darwin", "macos", "/users", "/applications"]),
];

/// Tagger backed by the static pattern tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedTagger;

impl RuleBasedTagger {
    /// Creates a new rule-based tagger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Tagger for RuleBasedTagger {
    fn generate(&self, entry: &Entry) -> Result<Vec<String>> {
        Ok(generate_tags_rule_based(entry))
    }
}

/// Error-type, framework, domain and platform tags for `entry`, sorted and
/// unique.
///
/// Each pattern table contributes at most its first match against the
/// lowercased file, explanation and signature.
#[must_use]
pub fn generate_tags_rule_based(entry: &Entry) -> Vec<String> {
    let text = format!(
        "{} {} {}",
        entry.file(),
        entry.explanation(),
        entry.error_signature()
    )
    .to_lowercase();

    let domain = first_match(DOMAIN_PATTERNS, &text).or_else(|| type_domain(entry.error_type()));
    let tags: BTreeSet<String> = [
        error_type_tag(entry.error_type()),
        first_match(FRAMEWORK_PATTERNS, &text).map(str::to_string),
        domain.map(str::to_string),
        first_match(PLATFORM_PATTERNS, &text).map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .collect();

    tracing::debug!(
        signature = %truncate_chars(entry.error_signature(), 50),
        tags = ?tags,
        "Generated rule-based tags"
    );
    tags.into_iter().collect()
}

fn type_domain(error_type: &str) -> Option<&'static str> {
    ERROR_TYPE_DOMAINS
        .iter()
        .find(|(name, _)| *name == error_type)
        .map(|(_, domain)| *domain)
}

/// Domain for a known exception type, else the lowercased type without
/// `error`/`exception`.
fn error_type_tag(error_type: &str) -> Option<String> {
    let error_type = error_type.trim();
    if error_type.is_empty() {
        return None;
    }
    if let Some(domain) = type_domain(error_type) {
        return Some(domain.to_string());
    }
    let stripped = error_type
        .to_lowercase()
        .replace("error", "")
        .replace("exception", "");
    let stripped = stripped.trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn first_match(table: PatternTable, text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|pattern| text.contains(pattern)))
        .map(|(tag, _)| *tag)
}
