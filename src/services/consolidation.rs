//! Consolidation orchestrator.
//!
//! Sweeps every discovered project: parse the session log, fold its entries
//! into the previously generated documents, tag, regenerate both documents
//! atomically and clear the log. Projects are processed one at a time; a
//! failing project is logged and counted, never allowed to stop the sweep.

use super::deduplication::{
    DeduplicationConfig, Deduplicator, ExactMatchDeduplicator, SemanticDeduplicator,
};
use super::discovery::ProjectDiscovery;
use super::merger::merge_fixes;
use super::rule_extractor::RuleExtractor;
use super::tagging::{AiTagger, RuleBasedTagger, Tagger};
use crate::config::{
    ConsolidationConfig, DEFAULT_FIX_SIMILARITY_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD,
    DedupStrategy,
};
use crate::llm::LlmProvider;
use crate::models::{ConsolidationResult, Entry, IdentityKey, ProcessRule, ProjectEntries};
use crate::parser::{parse_coding_tips, parse_fix_repo, parse_session_log};
use crate::rendering::{generate_coding_tips_markdown, generate_fix_repo_markdown};
use crate::storage::{ProjectPaths, clear_log, read_optional, write_all_atomic};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, instrument};

/// Knobs of one consolidation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationOptions {
    /// Parse and log only; write nothing and keep the log.
    pub dry_run: bool,
    /// Deduplication and tagging strategy.
    pub strategy: DedupStrategy,
    /// Whether near-identical fix variants are merged after deduplication.
    pub merge_similar_fixes: bool,
    /// Similarity threshold for AI deduplication.
    pub similarity_threshold: f64,
    /// Normalized-code similarity threshold for fix merging.
    pub fix_similarity_threshold: f64,
}

impl Default for ConsolidationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            strategy: DedupStrategy::Exact,
            merge_similar_fixes: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fix_similarity_threshold: DEFAULT_FIX_SIMILARITY_THRESHOLD,
        }
    }
}

impl ConsolidationOptions {
    /// Options taken from the loaded configuration.
    #[must_use]
    pub const fn from_config(config: &ConsolidationConfig) -> Self {
        Self {
            dry_run: false,
            strategy: config.strategy,
            merge_similar_fixes: config.merge_similar_fixes,
            similarity_threshold: config.similarity_threshold,
            fix_similarity_threshold: config.fix_similarity_threshold,
        }
    }

    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables fix merging.
    #[must_use]
    pub const fn with_merge_similar_fixes(mut self, enabled: bool) -> Self {
        self.merge_similar_fixes = enabled;
        self
    }
}

/// What happened to one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// Documents regenerated and the log cleared.
    Consolidated {
        /// Entries in the new `fix_repo.md`.
        errors: usize,
        /// Entries in the new `coding_tips.md`.
        process_issues: usize,
    },
    /// Dry run: nothing written.
    Planned {
        /// Entries `fix_repo.md` would hold.
        errors: usize,
        /// Entries `coding_tips.md` would hold.
        process_issues: usize,
    },
    /// No session log.
    Skipped,
}

/// Runs the consolidation pipeline over discovered projects.
pub struct ConsolidationService {
    options: ConsolidationOptions,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ConsolidationService {
    /// Creates a service without a language model.
    #[must_use]
    pub fn new(options: ConsolidationOptions) -> Self {
        Self { options, llm: None }
    }

    /// Sets the language model used by the `ai` strategy and rule previews.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Sets the language model if one is configured.
    #[must_use]
    pub fn with_optional_llm(mut self, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        self.llm = llm;
        self
    }

    /// The options this service runs with.
    #[must_use]
    pub const fn options(&self) -> &ConsolidationOptions {
        &self.options
    }

    /// Consolidates every project discovered under `root` plus `extra`.
    ///
    /// `dry_run` is or-ed with the configured option. A discovery failure
    /// counts as one failure and no project is touched.
    #[instrument(
        name = "errfix.consolidate",
        skip(self, discovery, extra),
        fields(root = %root.display(), dry_run = dry_run || self.options.dry_run)
    )]
    pub fn consolidate(
        &self,
        discovery: &dyn ProjectDiscovery,
        root: &Path,
        extra: &[PathBuf],
        dry_run: bool,
    ) -> ConsolidationResult {
        let start = Instant::now();
        let dry_run = dry_run || self.options.dry_run;

        let projects = match discovery.discover(root, extra) {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, "Project discovery failed");
                metrics::counter!("errfix_runs_total", "status" => "aborted").increment(1);
                return ConsolidationResult::aborted();
            },
        };
        tracing::info!(projects = projects.len(), "Starting consolidation");

        let mut result = ConsolidationResult::default();
        for project in &projects {
            let _span = info_span!("errfix.consolidate.project", project = %project.display())
                .entered();
            let status = match self.consolidate_project(project, dry_run) {
                Ok(ProjectOutcome::Skipped) => {
                    result.skipped_count += 1;
                    "skipped"
                },
                Ok(_) => {
                    result.ok_count += 1;
                    "ok"
                },
                Err(e) => {
                    tracing::error!(error = %e, "Project consolidation failed");
                    result.fail_count += 1;
                    "failed"
                },
            };
            metrics::counter!("errfix_projects_total", "status" => status).increment(1);
        }

        let status = if result.all_ok() { "ok" } else { "partial" };
        metrics::counter!("errfix_runs_total", "status" => status).increment(1);
        metrics::histogram!("errfix_run_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            ok = result.ok_count,
            failed = result.fail_count,
            skipped = result.skipped_count,
            duration_ms = start.elapsed().as_millis(),
            "Consolidation finished"
        );
        result
    }

    /// Runs the pipeline for one project.
    ///
    /// # Errors
    ///
    /// Returns an error when a document cannot be read or written, or when
    /// tagging fails without fallback.
    pub fn consolidate_project(&self, project: &Path, dry_run: bool) -> Result<ProjectOutcome> {
        let paths = ProjectPaths::new(project);
        let Some(log) = read_optional(&paths.session_log())? else {
            tracing::warn!(project = %project.display(), "Session log missing, skipping project");
            return Ok(ProjectOutcome::Skipped);
        };

        let parsed = ProjectEntries::from_entries(project, parse_session_log(&log));
        let existing_errors = read_optional(&paths.fix_repo())?
            .map(|text| parse_fix_repo(&text))
            .unwrap_or_default();
        let existing_tips = read_optional(&paths.coding_tips())?
            .map(|text| parse_coding_tips(&text))
            .unwrap_or_default();
        tracing::info!(
            project = %project.display(),
            errors = parsed.errors.len(),
            process_issues = parsed.process_issues.len(),
            existing_errors = existing_errors.len(),
            existing_tips = existing_tips.len(),
            "Parsed project documents"
        );

        let deduplicator = self.deduplicator();
        let mut errors = deduplicator.deduplicate(&parsed.errors, &existing_errors);
        let tips = deduplicator.deduplicate(&parsed.process_issues, &existing_tips);
        if self.options.merge_similar_fixes {
            errors = merge_identity_groups(&errors, self.options.fix_similarity_threshold);
        }

        let tagger = self.tagger();
        let errors = apply_tags(tagger.as_ref(), errors, &existing_errors)?;
        let tips = apply_tags(tagger.as_ref(), tips, &existing_tips)?;

        if dry_run {
            tracing::info!(
                project = %project.display(),
                fix_repo = %paths.fix_repo().display(),
                errors = errors.len(),
                process_issues = tips.len(),
                "Dry run: would write documents and clear the session log"
            );
            return Ok(ProjectOutcome::Planned {
                errors: errors.len(),
                process_issues: tips.len(),
            });
        }

        let fix_repo = generate_fix_repo_markdown(&errors);
        let coding_tips = generate_coding_tips_markdown(&tips);
        write_all_atomic(&[
            (paths.fix_repo().as_path(), fix_repo.as_str()),
            (paths.coding_tips().as_path(), coding_tips.as_str()),
        ])?;
        clear_log(project)?;

        metrics::counter!("errfix_entries_consolidated_total")
            .increment(u64::try_from(parsed.len()).unwrap_or(u64::MAX));
        tracing::info!(
            project = %project.display(),
            errors = errors.len(),
            process_issues = tips.len(),
            "Project consolidated"
        );
        Ok(ProjectOutcome::Consolidated {
            errors: errors.len(),
            process_issues: tips.len(),
        })
    }

    /// Extracts process rules from a project's session log without writing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the project has no session log,
    /// or an I/O error when it cannot be read.
    pub fn preview_rules(&self, project: &Path) -> Result<Vec<ProcessRule>> {
        let log_path = ProjectPaths::new(project).session_log();
        let log = read_optional(&log_path)?.ok_or_else(|| {
            Error::InvalidInput(format!("no session log at {}", log_path.display()))
        })?;

        let extractor = match &self.llm {
            Some(llm) => RuleExtractor::new().with_llm(Arc::clone(llm)),
            None => RuleExtractor::new(),
        };
        extractor.extract(&parse_session_log(&log))
    }

    fn ai_provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        match (self.options.strategy, &self.llm) {
            (DedupStrategy::Ai, Some(llm)) => Some(llm),
            (DedupStrategy::Ai, None) => {
                tracing::warn!("AI strategy requested without a language model, using exact matching");
                None
            },
            (DedupStrategy::Exact, _) => None,
        }
    }

    fn deduplicator(&self) -> Box<dyn Deduplicator> {
        match self.ai_provider() {
            Some(llm) => Box::new(SemanticDeduplicator::new(
                Arc::clone(llm),
                DeduplicationConfig::default().with_threshold(self.options.similarity_threshold),
            )),
            None => Box::new(ExactMatchDeduplicator::new()),
        }
    }

    fn tagger(&self) -> Box<dyn Tagger> {
        match self.ai_provider() {
            Some(llm) => Box::new(AiTagger::new(Arc::clone(llm))),
            None => Box::new(RuleBasedTagger::new()),
        }
    }
}

/// Tags every entry that is not an unchanged copy of an existing one.
fn apply_tags(tagger: &dyn Tagger, entries: Vec<Entry>, existing: &[Entry]) -> Result<Vec<Entry>> {
    entries
        .into_iter()
        .map(|entry| {
            if existing.contains(&entry) {
                Ok(entry)
            } else {
                tagger.apply(&entry)
            }
        })
        .collect()
}

/// Runs the fix merger within each identity group, groups kept in order of
/// first appearance.
fn merge_identity_groups(entries: &[Entry], threshold: f64) -> Vec<Entry> {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut groups: HashMap<IdentityKey, Vec<Entry>> = HashMap::new();
    for entry in entries {
        let key = entry.identity_key();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(entry.clone());
    }

    order
        .iter()
        .filter_map(|key| groups.get(key))
        .flat_map(|group| merge_fixes(group, threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::services::FilesystemDiscovery;
    use crate::storage::{LOG_HEADER, bootstrap_project, temp_path};
    use std::fs;
    use tempfile::TempDir;

    fn project_with_log(root: &Path, name: &str, body: &str) -> PathBuf {
        let project = root.join(name);
        bootstrap_project(&project).expect("bootstrap");
        fs::write(
            ProjectPaths::new(&project).session_log(),
            format!("{LOG_HEADER}{body}"),
        )
        .expect("write log");
        project
    }

    const TWO_RUNS: &str = "### Error: FileNotFoundError: config.yaml
**Timestamp:** 2025-01-15T10:30:00Z
**File:** `src/load.py`
**Success Count:** 3

**Fix Applied:**
```python
path = Path(__file__).parent / 'config.yaml'
```

**Explanation:** Resolve relative to the module.

**Result:** ✅ Fixed

### Error: FileNotFoundError: config.yaml
**Timestamp:** 2025-01-16T09:00:00Z
**File:** `src/load.py`
**Success Count:** 2

**Fix Applied:**
```python
path = Path(__file__).parent  /  'config.yaml'
```

### Agent Process Issue: Edited without reading
**Timestamp:** 2025-01-16T11:00:00Z
**Issue Type:** workflow

**Rule Established:**
Read a file before editing it.
";

    #[test]
    fn test_consolidates_and_clears_log() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let service = ConsolidationService::new(ConsolidationOptions::default());

        let outcome = service.consolidate_project(&project, false).expect("consolidate");
        assert_eq!(
            outcome,
            ProjectOutcome::Consolidated {
                errors: 1,
                process_issues: 1
            }
        );

        let paths = ProjectPaths::new(&project);
        let fixes = parse_fix_repo(&fs::read_to_string(paths.fix_repo()).expect("fix repo"));
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].success_count(), 5);
        assert!(fixes[0].tags().contains(&"file-io".to_string()));

        let tips = parse_coding_tips(&fs::read_to_string(paths.coding_tips()).expect("tips"));
        assert_eq!(tips[0].fix_code(), "Read a file before editing it.");
        assert_eq!(fs::read_to_string(paths.session_log()).expect("log"), LOG_HEADER);
    }

    #[test]
    fn test_second_run_accumulates() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let service = ConsolidationService::new(ConsolidationOptions::default());
        service.consolidate_project(&project, false).expect("first run");

        fs::write(
            ProjectPaths::new(&project).session_log(),
            format!("{LOG_HEADER}{TWO_RUNS}"),
        )
        .expect("rewrite log");
        service.consolidate_project(&project, false).expect("second run");

        let fixes = parse_fix_repo(
            &fs::read_to_string(ProjectPaths::new(&project).fix_repo()).expect("fix repo"),
        );
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].success_count(), 10);
    }

    #[test]
    fn test_failed_write_keeps_documents_for_retry() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let paths = ProjectPaths::new(&project);
        let service = ConsolidationService::new(ConsolidationOptions::default());
        let fix_repo_before = fs::read_to_string(paths.fix_repo()).expect("fix repo");

        let blocker = temp_path(&paths.coding_tips());
        fs::create_dir_all(blocker.join("occupied")).expect("block coding tips");
        assert!(service.consolidate_project(&project, false).is_err());
        assert_eq!(
            fs::read_to_string(paths.fix_repo()).expect("fix repo"),
            fix_repo_before
        );
        assert!(fs::read_to_string(paths.session_log()).expect("log").contains("### Error:"));

        fs::remove_dir_all(&blocker).expect("unblock");
        service.consolidate_project(&project, false).expect("retry");

        let fixes = parse_fix_repo(&fs::read_to_string(paths.fix_repo()).expect("fix repo"));
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].success_count(), 5);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let paths = ProjectPaths::new(&project);
        let before = fs::read_to_string(paths.fix_repo()).expect("fix repo");

        let result = ConsolidationService::new(ConsolidationOptions::default()).consolidate(
            &FilesystemDiscovery::new(),
            root.path(),
            &[],
            true,
        );
        assert_eq!(result.ok_count, 1);
        assert_eq!(fs::read_to_string(paths.fix_repo()).expect("fix repo"), before);
        assert!(fs::read_to_string(paths.session_log()).expect("log").contains("### Error:"));
    }

    #[test]
    fn test_missing_log_is_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let service = ConsolidationService::new(ConsolidationOptions::default());
        assert_eq!(
            service.consolidate_project(dir.path(), false).expect("skip"),
            ProjectOutcome::Skipped
        );
    }

    #[test]
    fn test_discovery_failure_aborts() {
        let dir = TempDir::new().expect("tempdir");
        let result = ConsolidationService::new(ConsolidationOptions::default()).consolidate(
            &FilesystemDiscovery::new(),
            &dir.path().join("missing"),
            &[],
            false,
        );
        assert_eq!(result, ConsolidationResult::aborted());
    }

    #[test]
    fn test_ai_strategy_without_provider_uses_exact() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let options = ConsolidationOptions::default().with_strategy(DedupStrategy::Ai);
        let outcome = ConsolidationService::new(options)
            .consolidate_project(&project, false)
            .expect("consolidate");
        assert!(matches!(outcome, ProjectOutcome::Consolidated { errors: 1, .. }));
    }

    #[test]
    fn test_ai_strategy_with_dead_provider_falls_back() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::failing());
        let options = ConsolidationOptions::default().with_strategy(DedupStrategy::Ai);
        let outcome = ConsolidationService::new(options)
            .with_llm(llm)
            .consolidate_project(&project, false)
            .expect("consolidate");
        assert_eq!(
            outcome,
            ProjectOutcome::Consolidated {
                errors: 1,
                process_issues: 1
            }
        );
    }

    #[test]
    fn test_merge_similar_fixes_folds_variants() {
        let entries = vec![
            Entry::error("E").error_type("T").fix_code("do_thing(x)").success_count(1).build(),
            Entry::error("E").error_type("T").fix_code("do_thing(x)  # retry").success_count(2).build(),
            Entry::error("F").error_type("T").fix_code("other()").success_count(1).build(),
        ];
        let merged = merge_identity_groups(&entries, DEFAULT_FIX_SIMILARITY_THRESHOLD);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].error_signature(), "E");
        assert_eq!(merged[0].success_count(), 3);
    }

    #[test]
    fn test_preview_rules() {
        let root = TempDir::new().expect("tempdir");
        let project = project_with_log(root.path(), "app", TWO_RUNS);
        let rules = ConsolidationService::new(ConsolidationOptions::default())
            .preview_rules(&project)
            .expect("rules");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].title, "Edited without reading");
        assert!(
            ConsolidationService::new(ConsolidationOptions::default())
                .preview_rules(&root.path().join("none"))
                .is_err()
        );
    }
}
