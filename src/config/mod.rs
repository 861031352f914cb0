//! Configuration management.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config`, `ERRFIX_CONFIG_PATH`, or the
//!    platform config directory)
//! 3. Environment variables (`PROJECTS_ROOT`, `LLM_PROVIDER`, ...)
//!
//! # Example file
//!
//! ```toml
//! [consolidation]
//! projects_root = "/home/me/code"
//! projects = ["/srv/extra-project"]
//! schedule = "0 2 * * *"
//! similarity_threshold = 0.85
//! strategy = "ai"
//!
//! [llm]
//! provider = "ollama"
//! default_model = "qwen3:8b"
//!
//! [llm.models]
//! tagging = "llama3.2"
//! ```

use crate::llm::LlmTask;
use crate::{Error, Result};
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Default cron schedule: daily at 02:00.
pub const DEFAULT_SCHEDULE: &str = "0 2 * * *";

/// Default similarity threshold for AI deduplication.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Default similarity threshold for merging near-identical fixes.
pub const DEFAULT_FIX_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "qwen3:8b";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ERRFIX_CONFIG_PATH";

/// Five whitespace-separated cron fields.
static CRON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\S+\s+\S+\s+\S+\s+\S+\s+\S+\s*$").unwrap_or_else(|_| unreachable!())
});

/// How new entries are matched against existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// Identity-key matching only.
    #[default]
    Exact,
    /// Language-model similarity scoring, falling back to exact matching.
    Ai,
}

impl DedupStrategy {
    /// Parses a strategy name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "ai" | "semantic" => Some(Self::Ai),
            _ => None,
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderKind {
    /// No language model; AI features fall back to deterministic paths.
    Disabled,
    /// Ollama (local).
    #[default]
    Ollama,
    /// `OpenAI` or a compatible endpoint.
    OpenAi,
    /// Anthropic Claude.
    Anthropic,
}

impl LlmProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "none" | "disabled" | "off" => Some(Self::Disabled),
            _ => None,
        }
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-task model overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskModels {
    /// Model for similarity scoring.
    pub deduplication: Option<String>,
    /// Model for tag generation.
    pub tagging: Option<String>,
    /// Model for rule extraction.
    pub rule_extraction: Option<String>,
}

impl TaskModels {
    /// Returns the override for `task`, if any.
    #[must_use]
    pub fn get(&self, task: LlmTask) -> Option<&str> {
        match task {
            LlmTask::Deduplication => self.deduplication.as_deref(),
            LlmTask::Tagging => self.tagging.as_deref(),
            LlmTask::RuleExtraction => self.rule_extraction.as_deref(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Which provider to call.
    pub provider: LlmProviderKind,
    /// Default model name.
    pub model: Option<String>,
    /// Per-task model overrides.
    pub task_models: TaskModels,
    /// API key for hosted providers.
    pub api_key: Option<SecretString>,
    /// Base URL override (self-hosted or proxy endpoints).
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Retries for timeouts and connection failures.
    pub max_retries: Option<u32>,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Consecutive failures before the circuit opens.
    pub breaker_failure_threshold: Option<u32>,
    /// How long the circuit stays open in milliseconds.
    pub breaker_reset_ms: Option<u64>,
}

impl LlmConfig {
    /// The configured default model, or [`DEFAULT_MODEL`].
    #[must_use]
    pub fn default_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// The model used for `task`: its override, else the default model.
    #[must_use]
    pub fn model_for_task(&self, task: LlmTask) -> &str {
        self.task_models
            .get(task)
            .unwrap_or_else(|| self.default_model())
    }
}

/// Main configuration for errfix.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Directory whose immediate subdirectories are candidate projects.
    pub projects_root: Option<PathBuf>,
    /// Additional project paths outside the root.
    pub extra_projects: Vec<PathBuf>,
    /// Language-model settings.
    pub llm: LlmConfig,
    /// Minimum AI similarity for two entries to merge.
    pub similarity_threshold: f64,
    /// Minimum text similarity for two fixes to merge.
    pub fix_similarity_threshold: f64,
    /// Five-field cron schedule for external schedulers.
    pub consolidation_schedule: String,
    /// Deduplication strategy.
    pub strategy: DedupStrategy,
    /// Whether near-identical fixes for one error are merged.
    pub merge_similar_fixes: bool,
    /// Config file the settings were read from, if any.
    pub config_source: Option<PathBuf>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            projects_root: None,
            extra_projects: Vec::new(),
            llm: LlmConfig::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fix_similarity_threshold: DEFAULT_FIX_SIMILARITY_THRESHOLD,
            consolidation_schedule: DEFAULT_SCHEDULE.to_string(),
            strategy: DedupStrategy::default(),
            merge_similar_fixes: false,
            config_source: None,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Consolidation section.
    pub consolidation: Option<ConfigFileConsolidation>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
}

/// Consolidation section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileConsolidation {
    /// Projects root.
    pub projects_root: Option<String>,
    /// Extra project paths.
    pub projects: Option<Vec<String>>,
    /// Cron schedule.
    pub schedule: Option<String>,
    /// AI similarity threshold.
    pub similarity_threshold: Option<f64>,
    /// Fix merge threshold.
    pub fix_similarity_threshold: Option<f64>,
    /// Strategy name.
    pub strategy: Option<String>,
    /// Merge near-identical fixes.
    pub merge_similar_fixes: Option<bool>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Default model name.
    pub default_model: Option<String>,
    /// Per-task models.
    pub models: Option<TaskModels>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Retry count.
    pub max_retries: Option<u32>,
    /// Retry backoff in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Circuit breaker failure threshold.
    pub breaker_failure_threshold: Option<u32>,
    /// Circuit breaker reset in milliseconds.
    pub breaker_reset_ms: Option<u64>,
}

impl ConsolidationConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the effective configuration.
    ///
    /// Reads `path` when given, else the file named by
    /// `ERRFIX_CONFIG_PATH`, else the default location; then applies
    /// environment overrides. A missing default file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let config = match path.map(Path::to_path_buf).or(env_path) {
            Some(explicit) => Self::load_from_file(&explicit)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        tracing::debug!(path = %path.display(), "Loaded config file");
        let mut config = Self::from_config_file(file);
        config.config_source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/errfix/` on macOS)
    /// 2. XDG config dir (`~/.config/errfix/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("errfix").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("errfix")
                .join("config.toml"),
        ];
        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(
                    path = %candidate.display(),
                    error = %e,
                    "Ignoring unreadable config file"
                ),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `ConsolidationConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(cons) = file.consolidation {
            if let Some(root) = cons.projects_root.filter(|r| !r.trim().is_empty()) {
                config.projects_root = Some(PathBuf::from(root.trim()));
            }
            if let Some(projects) = cons.projects {
                config.extra_projects = projects
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect();
            }
            if let Some(schedule) = cons.schedule {
                config.consolidation_schedule = schedule.trim().to_string();
            }
            if let Some(threshold) = cons.similarity_threshold {
                config.similarity_threshold = threshold;
            }
            if let Some(threshold) = cons.fix_similarity_threshold {
                config.fix_similarity_threshold = threshold;
            }
            if let Some(strategy) = cons.strategy {
                config.set_strategy(&strategy);
            }
            if let Some(merge) = cons.merge_similar_fixes {
                config.merge_similar_fixes = merge;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.set_provider(&provider);
            }
            config.llm.model = llm.default_model.filter(|m| !m.trim().is_empty());
            config.llm.task_models = llm.models.unwrap_or_default();
            config.llm.api_key = llm.api_key.map(SecretString::from);
            config.llm.base_url = llm.base_url;
            config.llm.timeout_ms = llm.timeout_ms;
            config.llm.connect_timeout_ms = llm.connect_timeout_ms;
            config.llm.max_retries = llm.max_retries;
            config.llm.retry_backoff_ms = llm.retry_backoff_ms;
            config.llm.breaker_failure_threshold = llm.breaker_failure_threshold;
            config.llm.breaker_reset_ms = llm.breaker_reset_ms;
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; blank values count as unset.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(root) = get("PROJECTS_ROOT") {
            self.projects_root = Some(PathBuf::from(root));
        }
        if let Some(provider) = get("LLM_PROVIDER") {
            self.set_provider(&provider);
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(model) = get("LLM_MODEL_DEDUPLICATION") {
            self.llm.task_models.deduplication = Some(model);
        }
        if let Some(model) = get("LLM_MODEL_TAGGING") {
            self.llm.task_models.tagging = Some(model);
        }
        if let Some(model) = get("LLM_MODEL_RULE_EXTRACTION") {
            self.llm.task_models.rule_extraction = Some(model);
        }
        if let Some(key) = get("LLM_API_KEY") {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(schedule) = get("CONSOLIDATION_SCHEDULE") {
            self.consolidation_schedule = schedule;
        }
        if let Some(threshold) = get("SIMILARITY_THRESHOLD") {
            match threshold.parse::<f64>() {
                Ok(parsed) => self.similarity_threshold = parsed,
                Err(_) => tracing::warn!(
                    value = %threshold,
                    "Ignoring non-numeric SIMILARITY_THRESHOLD"
                ),
            }
        }
        if let Some(strategy) = get("CONSOLIDATION_STRATEGY") {
            self.set_strategy(&strategy);
        }

        self
    }

    fn set_provider(&mut self, name: &str) {
        match LlmProviderKind::parse(name) {
            Some(provider) => self.llm.provider = provider,
            None => tracing::warn!(provider = %name, "Unknown LLM provider, keeping {}", self.llm.provider),
        }
    }

    fn set_strategy(&mut self, name: &str) {
        match DedupStrategy::parse(name) {
            Some(strategy) => self.strategy = strategy,
            None => tracing::warn!(strategy = %name, "Unknown strategy, keeping {}", self.strategy),
        }
    }

    /// Sets the projects root.
    #[must_use]
    pub fn with_projects_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.projects_root = Some(path.into());
        self
    }

    /// Adds extra project paths.
    #[must_use]
    pub fn with_extra_projects<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.extra_projects.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sets the deduplication strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The model used for `task`.
    #[must_use]
    pub fn model_for_task(&self, task: LlmTask) -> &str {
        self.llm.model_for_task(task)
    }

    /// Checks the settings a consolidation run depends on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the projects root is unset,
    /// missing or not a directory, when the schedule does not have five
    /// cron fields, or when a threshold lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = &self.projects_root else {
            return Err(Error::InvalidInput(
                "projects root is not set (PROJECTS_ROOT, --root, or consolidation.projects_root)"
                    .to_string(),
            ));
        };
        if !root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "projects root is not a directory: {}",
                root.display()
            )));
        }
        if !CRON_PATTERN.is_match(&self.consolidation_schedule) {
            return Err(Error::InvalidInput(format!(
                "consolidation schedule must have five cron fields: {:?}",
                self.consolidation_schedule
            )));
        }
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("fix_similarity_threshold", self.fix_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConsolidationConfig::default();
        assert_eq!(config.llm.provider, LlmProviderKind::Ollama);
        assert_eq!(config.llm.default_model(), "qwen3:8b");
        assert_eq!(config.consolidation_schedule, "0 2 * * *");
        assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.strategy, DedupStrategy::Exact);
        assert!(!config.merge_similar_fixes);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[consolidation]
projects_root = "/srv/code"
projects = ["/srv/a", "  ", "/srv/b"]
schedule = "30 3 * * 1"
similarity_threshold = 0.9
strategy = "ai"
merge_similar_fixes = true

[llm]
provider = "anthropic"
default_model = "claude-3-5-haiku-latest"
api_key = "sk-ant-test"
max_retries = 4

[llm.models]
tagging = "claude-3-haiku-20240307"
"#,
        )
        .expect("write config");

        let config = ConsolidationConfig::load_from_file(&path).expect("load");
        assert_eq!(config.projects_root, Some(PathBuf::from("/srv/code")));
        assert_eq!(
            config.extra_projects,
            [PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
        assert_eq!(config.consolidation_schedule, "30 3 * * 1");
        assert_eq!(config.strategy, DedupStrategy::Ai);
        assert!(config.merge_similar_fixes);
        assert_eq!(config.llm.provider, LlmProviderKind::Anthropic);
        assert_eq!(config.llm.max_retries, Some(4));
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-ant-test".to_string())
        );
        assert_eq!(
            config.model_for_task(LlmTask::Tagging),
            "claude-3-haiku-20240307"
        );
        assert_eq!(
            config.model_for_task(LlmTask::Deduplication),
            "claude-3-5-haiku-latest"
        );
        assert_eq!(config.config_source, Some(path));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = TempDir::new().expect("tempdir");
        let result = ConsolidationConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[consolidation\nschedule = ").expect("write");
        assert!(matches!(
            ConsolidationConfig::load_from_file(&path),
            Err(Error::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = ConsolidationConfig {
            consolidation_schedule: "0 4 * * *".to_string(),
            ..ConsolidationConfig::default()
        }
        .with_overrides_from(env(&[
            ("PROJECTS_ROOT", "/env/root"),
            ("LLM_PROVIDER", "OpenAI"),
            ("LLM_MODEL", "gpt-4o"),
            ("LLM_MODEL_RULE_EXTRACTION", "o3-mini"),
            ("CONSOLIDATION_SCHEDULE", "15 1 * * *"),
            ("SIMILARITY_THRESHOLD", "0.7"),
            ("CONSOLIDATION_STRATEGY", "ai"),
        ]));

        assert_eq!(config.projects_root, Some(PathBuf::from("/env/root")));
        assert_eq!(config.llm.provider, LlmProviderKind::OpenAi);
        assert_eq!(config.model_for_task(LlmTask::Tagging), "gpt-4o");
        assert_eq!(config.model_for_task(LlmTask::RuleExtraction), "o3-mini");
        assert_eq!(config.consolidation_schedule, "15 1 * * *");
        assert!((config.similarity_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.strategy, DedupStrategy::Ai);
    }

    #[test]
    fn test_blank_and_invalid_env_values_are_ignored() {
        let config = ConsolidationConfig::default().with_overrides_from(env(&[
            ("LLM_MODEL", "   "),
            ("SIMILARITY_THRESHOLD", "high"),
            ("LLM_PROVIDER", "mystery"),
        ]));
        assert_eq!(config.llm.default_model(), DEFAULT_MODEL);
        assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.llm.provider, LlmProviderKind::Ollama);
    }

    #[test]
    fn test_validate_accepts_defaults_with_root() {
        let dir = TempDir::new().expect("tempdir");
        let config = ConsolidationConfig::new().with_projects_root(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_root() {
        assert!(matches!(
            ConsolidationConfig::new().validate(),
            Err(Error::InvalidInput(_))
        ));
        let missing = ConsolidationConfig::new().with_projects_root("/definitely/not/here");
        assert!(missing.validate().is_err());
    }

    #[test_case("0 2 * * *", true)]
    #[test_case("  */5 * * * 1-5 ", true)]
    #[test_case("0 2 * *", false)]
    #[test_case("0 2 * * * *", false)]
    #[test_case("", false)]
    fn test_validate_schedule(schedule: &str, ok: bool) {
        let dir = TempDir::new().expect("tempdir");
        let config = ConsolidationConfig {
            consolidation_schedule: schedule.to_string(),
            ..ConsolidationConfig::new().with_projects_root(dir.path())
        };
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test_case(-0.1, false)]
    #[test_case(0.0, true)]
    #[test_case(1.0, true)]
    #[test_case(1.5, false)]
    fn test_validate_threshold(threshold: f64, ok: bool) {
        let dir = TempDir::new().expect("tempdir");
        let config = ConsolidationConfig {
            similarity_threshold: threshold,
            ..ConsolidationConfig::new().with_projects_root(dir.path())
        };
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test_case("ollama", Some(LlmProviderKind::Ollama))]
    #[test_case("OPENAI", Some(LlmProviderKind::OpenAi))]
    #[test_case("anthropic", Some(LlmProviderKind::Anthropic))]
    #[test_case("none", Some(LlmProviderKind::Disabled))]
    #[test_case("lmstudio", None)]
    fn test_provider_parse(input: &str, expected: Option<LlmProviderKind>) {
        assert_eq!(LlmProviderKind::parse(input), expected);
    }
}
