//! Consolidation command handlers.

use anyhow::{Context, bail};
use errfix::config::{ConsolidationConfig, DedupStrategy};
use errfix::llm;
use errfix::rendering::render_process_rules;
use errfix::storage::bootstrap_project;
use errfix::{ConsolidationOptions, ConsolidationService, FilesystemDiscovery};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Command-line overrides for `consolidate`.
pub struct ConsolidateArgs {
    /// Projects root override.
    pub root: Option<PathBuf>,
    /// Extra project paths, appended to the configured ones.
    pub extra: Vec<PathBuf>,
    /// Skip all writes.
    pub dry_run: bool,
    /// Strategy override.
    pub strategy: Option<String>,
}

/// Consolidate command.
///
/// Exits with failure when any project failed.
pub fn cmd_consolidate(
    mut config: ConsolidationConfig,
    args: ConsolidateArgs,
) -> anyhow::Result<ExitCode> {
    if let Some(root) = args.root {
        config = config.with_projects_root(root);
    }
    config = config.with_extra_projects(args.extra);
    if let Some(name) = args.strategy {
        let Some(strategy) = DedupStrategy::parse(&name) else {
            bail!("unknown strategy {name:?}, expected exact or ai");
        };
        config = config.with_strategy(strategy);
    }
    config.validate().context("invalid configuration")?;

    let Some(root) = config.projects_root.clone() else {
        bail!("projects root is not set");
    };

    let llm = match config.strategy {
        DedupStrategy::Ai => llm::provider_from_config(&config.llm),
        DedupStrategy::Exact => None,
    };
    let service = ConsolidationService::new(ConsolidationOptions::from_config(&config))
        .with_optional_llm(llm);

    if args.dry_run {
        println!("Dry run: no files will be written.");
    }
    println!("Consolidating projects under {}", root.display());
    println!("Strategy: {}", config.strategy);
    println!();

    let result = service.consolidate(
        &FilesystemDiscovery::new(),
        &root,
        &config.extra_projects,
        args.dry_run,
    );

    println!("Consolidation completed.");
    println!("  Succeeded: {}", result.ok_count);
    println!("  Failed: {}", result.fail_count);
    println!("  Skipped: {}", result.skipped_count);

    Ok(if result.all_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Bootstrap command.
pub fn cmd_bootstrap(path: &Path) -> anyhow::Result<ExitCode> {
    let created = bootstrap_project(path)
        .with_context(|| format!("failed to bootstrap {}", path.display()))?;

    if created.is_empty() {
        println!("Nothing to do: {} is already set up.", path.display());
    } else {
        println!("Created:");
        for file in &created {
            println!("  - {}", file.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Rules command.
///
/// Uses the configured language model when one is available and falls back
/// to the built-in rules otherwise.
pub fn cmd_rules(config: &ConsolidationConfig, path: &Path) -> anyhow::Result<ExitCode> {
    let service = ConsolidationService::new(ConsolidationOptions::from_config(config))
        .with_optional_llm(llm::provider_from_config(&config.llm));
    let rules = service
        .preview_rules(path)
        .with_context(|| format!("failed to extract rules from {}", path.display()))?;

    if rules.is_empty() {
        println!("No process issues logged in {}.", path.display());
    } else {
        print!("{}", render_process_rules(&rules));
    }
    Ok(ExitCode::SUCCESS)
}
