//! Config command handler.

use errfix::config::ConsolidationConfig;
use errfix::llm::LlmTask;

/// Config command.
pub fn cmd_config(config: &ConsolidationConfig) {
    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Config File:");
    match &config.config_source {
        Some(source) => println!("  - {}", source.display()),
        None => println!("  (none - using defaults)"),
    }
    println!();

    println!("Consolidation:");
    println!(
        "  Projects Root: {}",
        config
            .projects_root
            .as_ref()
            .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
    );
    if config.extra_projects.is_empty() {
        println!("  Extra Projects: (none)");
    } else {
        println!("  Extra Projects:");
        for project in &config.extra_projects {
            println!("    - {}", project.display());
        }
    }
    println!("  Schedule: {}", config.consolidation_schedule);
    println!("  Strategy: {}", config.strategy);
    println!("  Similarity Threshold: {:.2}", config.similarity_threshold);
    println!(
        "  Fix Similarity Threshold: {:.2}",
        config.fix_similarity_threshold
    );
    println!("  Merge Similar Fixes: {}", config.merge_similar_fixes);
    println!();

    println!("LLM Configuration:");
    println!("  Provider: {}", config.llm.provider);
    println!("  Model: {}", config.llm.default_model());
    for task in [
        LlmTask::Deduplication,
        LlmTask::Tagging,
        LlmTask::RuleExtraction,
    ] {
        println!("    {task}: {}", config.model_for_task(task));
    }
    println!(
        "  Base URL: {}",
        config.llm.base_url.as_deref().unwrap_or("(default)")
    );
    println!(
        "  API Key: {}",
        if config.llm.api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
}
