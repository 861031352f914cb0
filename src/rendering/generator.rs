//! Deterministic markdown generation for the fix repository and coding tips.
//!
//! Output depends only on the entries passed in: groups are ordered by key,
//! entries inside a group by descending success count (stable), and the
//! "Last Updated" header is the newest entry timestamp rather than the
//! wall clock.

use super::markdown::{fence_for, format_date, format_tags, format_timestamp, heading_text};
use crate::models::{Entry, ProcessRule};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Title line of `fix_repo.md`.
pub const FIX_REPO_TITLE: &str = "# Fix Repository";
/// Title line of `coding_tips.md`.
pub const CODING_TIPS_TITLE: &str = "# Coding Tips - Agent Process Rules";
/// Title line of a rendered rule preview.
pub const PROCESS_RULES_TITLE: &str = "# Process Rules";
/// Category used for untagged, untyped process issues.
pub const GENERAL_CATEGORY: &str = "General";

/// Renders the error entries of `entries` as `fix_repo.md`.
///
/// Process issues are ignored. Empty input renders the header with
/// `Total Entries: 0` and no groups.
pub fn generate_fix_repo_markdown(entries: &[Entry]) -> String {
    let errors: Vec<&Entry> = entries.iter().filter(|e| !e.is_process_issue()).collect();
    let files: BTreeSet<&str> = errors
        .iter()
        .map(|e| e.file())
        .filter(|f| !f.is_empty())
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "{FIX_REPO_TITLE}\n");
    let _ = writeln!(out, "> Last Updated: {}", last_updated(&errors));
    let _ = writeln!(out, "> Total Entries: {}", errors.len());
    let _ = writeln!(out, "> Consolidated from: {} files", files.len());
    let _ = writeln!(out, "\n---");

    for (signature, group) in group_sorted(&errors, |e| e.error_signature().to_string()) {
        render_fix_group(&mut out, &signature, &group);
    }
    out
}

fn render_fix_group(out: &mut String, signature: &str, group: &[&Entry]) {
    let tags: BTreeSet<&String> = group.iter().flat_map(|e| e.tags()).collect();
    let tags: Vec<String> = tags.into_iter().cloned().collect();
    let first_seen = group.iter().map(|e| e.timestamp()).min();
    let last_seen = group.iter().map(|e| e.timestamp()).max();
    let occurrences: u64 = group.iter().map(|e| u64::from(e.success_count())).sum();

    let _ = writeln!(out, "\n## {}\n", heading_text(signature));
    if !tags.is_empty() {
        let _ = writeln!(out, "**Tags:** {}", format_tags(&tags));
    }
    if let (Some(first), Some(last)) = (first_seen, last_seen) {
        let _ = writeln!(out, "**First Seen:** {}", format_date(first));
        let _ = writeln!(out, "**Last Updated:** {}", format_date(last));
    }
    let _ = writeln!(out, "**Total Occurrences:** {occurrences}");

    for (index, entry) in group.iter().enumerate() {
        render_fix(out, index + 1, entry);
    }
}

fn render_fix(out: &mut String, number: usize, entry: &Entry) {
    let count = entry.success_count();
    if entry.error_type().is_empty() {
        let _ = writeln!(out, "\n### Fix {number} (Success Count: {count})\n");
    } else {
        let kind = heading_text(entry.error_type());
        let _ = writeln!(out, "\n### Fix {number}: {kind} (Success Count: {count})\n");
    }

    if !entry.file().is_empty() {
        let _ = writeln!(out, "**File:** `{}`", entry.file());
    }
    if entry.line() > 0 {
        let _ = writeln!(out, "**Line:** {}", entry.line());
    }
    if !entry.tags().is_empty() {
        let _ = writeln!(out, "**Tags:** {}", format_tags(entry.tags()));
    }
    let _ = writeln!(out, "**Timestamp:** {}", format_timestamp(entry.timestamp()));
    if !entry.result().is_empty() {
        let _ = writeln!(out, "**Result:** {}", entry.result());
    }

    if !entry.fix_code().is_empty() {
        let fence = fence_for(entry.fix_code());
        let _ = writeln!(out, "\n**Code:**\n{fence}\n{}\n{fence}", entry.fix_code());
    }
    if !entry.explanation().is_empty() {
        let _ = writeln!(out, "\n**Why this works:** {}", entry.explanation());
    }
    let _ = writeln!(out, "\n---");
}

/// Renders the process issues of `entries` as `coding_tips.md`.
///
/// Issues are grouped by their first tag, falling back to the issue type and
/// then to `General`.
pub fn generate_coding_tips_markdown(entries: &[Entry]) -> String {
    let issues: Vec<&Entry> = entries.iter().filter(|e| e.is_process_issue()).collect();

    let mut out = String::new();
    let _ = writeln!(out, "{CODING_TIPS_TITLE}\n");
    let _ = writeln!(out, "> Last Updated: {}", last_updated(&issues));
    let _ = writeln!(out, "> Total Rules: {}", issues.len());
    let _ = writeln!(out, "\n---");

    for (category, group) in group_sorted(&issues, |e| category_of(e).to_string()) {
        let _ = writeln!(out, "\n## {}", heading_text(&category));
        for issue in group {
            render_tip(&mut out, issue);
        }
    }
    out
}

/// Category heading a process issue is filed under.
pub fn category_of(entry: &Entry) -> &str {
    entry
        .tags()
        .first()
        .map(String::as_str)
        .filter(|tag| !tag.is_empty())
        .or_else(|| Some(entry.error_type()).filter(|t| !t.is_empty()))
        .unwrap_or(GENERAL_CATEGORY)
}

fn render_tip(out: &mut String, issue: &Entry) {
    let _ = writeln!(out, "\n### Rule: {}\n", heading_text(issue.error_signature()));
    if !issue.error_type().is_empty() {
        let _ = writeln!(out, "**Issue Type:** {}", issue.error_type());
    }
    if !issue.tags().is_empty() {
        let _ = writeln!(out, "**Tags:** {}", format_tags(issue.tags()));
    }
    let _ = writeln!(out, "**Timestamp:** {}", format_timestamp(issue.timestamp()));
    let _ = writeln!(out, "**Success Count:** {}", issue.success_count());
    if !issue.result().is_empty() {
        let _ = writeln!(out, "**Result:** {}", issue.result());
    }
    if !issue.fix_code().is_empty() {
        let _ = writeln!(out, "\n**Rule Established:** {}", issue.fix_code());
    }
    if !issue.explanation().is_empty() {
        let _ = writeln!(out, "\n**Why:** {}", issue.explanation());
    }
    if !issue.error_type().is_empty() {
        let related = [issue.error_type().to_string()];
        let _ = writeln!(out, "\n**Related Errors:** {}", format_tags(&related));
    }
    let _ = writeln!(out, "\n---");
}

/// Renders extracted process rules for preview.
pub fn render_process_rules(rules: &[ProcessRule]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{PROCESS_RULES_TITLE}\n");
    let _ = writeln!(out, "> Total Rules: {}", rules.len());
    let _ = writeln!(out, "\n---");

    for rule in rules {
        let _ = writeln!(out, "\n## {}\n", heading_text(&rule.title));
        let _ = writeln!(out, "**Rule:** {}\n", rule.rule);
        let _ = writeln!(out, "**Why:** {}", rule.why);
        if !rule.examples_good.is_empty() || !rule.examples_bad.is_empty() {
            let _ = writeln!(out, "\n**Examples:**");
            for example in &rule.examples_good {
                let _ = writeln!(out, "- ✅ {example}");
            }
            for example in &rule.examples_bad {
                let _ = writeln!(out, "- ❌ {example}");
            }
        }
        if !rule.related_errors.is_empty() {
            let _ = writeln!(
                out,
                "\n**Related Errors:** {}",
                format_tags(&rule.related_errors)
            );
        }
        let _ = writeln!(out, "\n---");
    }
    out
}

/// Groups by key in lexicographic order; each group sorted by success count
/// descending, ties keeping input order.
fn group_sorted<'a>(
    entries: &[&'a Entry],
    key: impl Fn(&Entry) -> String,
) -> BTreeMap<String, Vec<&'a Entry>> {
    let mut groups: BTreeMap<String, Vec<&'a Entry>> = BTreeMap::new();
    for &entry in entries {
        groups.entry(key(entry)).or_default().push(entry);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.success_count().cmp(&a.success_count()));
    }
    groups
}

fn last_updated(entries: &[&Entry]) -> String {
    entries
        .iter()
        .map(|e| e.timestamp())
        .max()
        .map_or_else(|| "never".to_string(), format_timestamp)
}
