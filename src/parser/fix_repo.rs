//! Reverse parser for generated `fix_repo.md` documents.

use super::{BlockFields, split_blocks};
use crate::models::Entry;
use crate::rendering::markdown::parse_heading_text;

#[derive(Debug)]
enum Heading<'a> {
    Group(&'a str),
    Fix {
        error_type: String,
        success_count: Option<u32>,
    },
}

fn classify(line: &str) -> Option<Heading<'_>> {
    if let Some(rest) = line.strip_prefix("### Fix ") {
        let (error_type, success_count) = parse_fix_heading(rest);
        return Some(Heading::Fix {
            error_type,
            success_count,
        });
    }
    line.strip_prefix("## ").map(Heading::Group)
}

/// Splits `3: TypeError (Success Count: 5)` into its type and count.
fn parse_fix_heading(rest: &str) -> (String, Option<u32>) {
    let Some((left, right)) = rest.rsplit_once(" (Success Count: ") else {
        return (String::new(), None);
    };
    let count = right
        .strip_suffix(')')
        .and_then(|n| n.trim().parse::<u32>().ok());
    let error_type = left
        .split_once(": ")
        .map(|(_, kind)| parse_heading_text(kind))
        .unwrap_or_default();
    (error_type, count)
}

/// Parses a previously generated fix repository back into error entries.
///
/// Every `### Fix` sub-block becomes one entry carrying the signature of the
/// `##` group above it. Sub-blocks outside a group, with a malformed
/// heading, or with an unparseable timestamp are dropped with a warning.
pub fn parse_fix_repo(text: &str) -> Vec<Entry> {
    let mut signature: Option<String> = None;
    let mut entries = Vec::new();

    for block in split_blocks(text, classify) {
        match block.head {
            Heading::Group(heading) => signature = Some(parse_heading_text(heading)),
            Heading::Fix {
                error_type,
                success_count,
            } => {
                let Some(signature) = signature.as_deref() else {
                    tracing::warn!("Dropping fix outside of a signature group");
                    continue;
                };
                let Some(success_count) = success_count else {
                    tracing::warn!(signature, "Dropping fix with malformed heading");
                    continue;
                };
                let fields = BlockFields::scan(&block.lines);
                let timestamp = match fields.timestamp() {
                    Ok(ts) => ts,
                    Err(raw) => {
                        tracing::warn!(signature, timestamp = %raw, "Dropping fix with invalid timestamp");
                        continue;
                    },
                };
                entries.push(
                    Entry::error(signature)
                        .error_type(error_type)
                        .file(fields.text("file"))
                        .line(fields.count("line"))
                        .fix_code(fields.code("code").unwrap_or_default())
                        .explanation(fields.section("why this works"))
                        .result(fields.text("result"))
                        .success_count(success_count)
                        .tags(fields.tags())
                        .timestamp(timestamp)
                        .build(),
                );
            },
        }
    }

    entries
}
