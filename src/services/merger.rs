//! Fuzzy fix merging.
//!
//! Operates on entries that already share one identity key but still carry
//! textually different fixes. Fixes whose normalized code is at least
//! [`DEFAULT_FIX_SIMILARITY_THRESHOLD`] similar are folded into one entry;
//! the rest stay as variants. Output is sorted by success count, highest
//! first, ties keeping input order.

use crate::models::{Entry, SOLVED_MARKER};
use std::collections::BTreeSet;
use tracing::instrument;

/// Minimum normalized-code similarity for two fixes to merge.
pub const DEFAULT_FIX_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Fix-related projection of an [`Entry`] used while clustering.
#[derive(Debug, Clone, Copy)]
pub struct Fix<'a> {
    /// Entry the fix was projected from.
    pub entry: &'a Entry,
    normalized: &'a str,
}

impl<'a> Fix<'a> {
    /// Projects `entry`, with `normalized` its [`normalize_code`] form.
    #[must_use]
    pub const fn new(entry: &'a Entry, normalized: &'a str) -> Self {
        Self { entry, normalized }
    }

    /// Fix code as written.
    #[must_use]
    pub fn code(&self) -> &str {
        self.entry.fix_code()
    }

    /// Success count of the source entry.
    #[must_use]
    pub const fn success_count(&self) -> u32 {
        self.entry.success_count()
    }
}

/// Merges near-identical fixes among `entries`.
///
/// The canonical member of each cluster is the one with the highest
/// `(success_count, fix length)`; it supplies the code, type and
/// explanation. Counts are summed, tags unioned and the result prefers any
/// member marked solved.
#[must_use]
#[instrument(skip(entries), fields(entries = entries.len()))]
pub fn merge_fixes(entries: &[Entry], threshold: f64) -> Vec<Entry> {
    let normalized: Vec<String> = entries.iter().map(|e| normalize_code(e.fix_code())).collect();
    let fixes: Vec<Fix<'_>> = entries
        .iter()
        .zip(&normalized)
        .map(|(entry, normalized)| Fix::new(entry, normalized))
        .collect();

    let mut merged: Vec<Entry> = group_similar_fixes(&fixes, threshold)
        .iter()
        .filter_map(|cluster| merge_cluster(cluster))
        .collect();
    merged.sort_by(|a, b| b.success_count().cmp(&a.success_count()));

    if merged.len() < entries.len() {
        tracing::debug!(
            before = entries.len(),
            after = merged.len(),
            "Merged similar fixes"
        );
    }
    merged
}

/// Clusters fixes greedily: each fix joins the first cluster holding any
/// member at or above `threshold`, otherwise it starts a new one.
#[must_use]
pub fn group_similar_fixes<'a>(fixes: &[Fix<'a>], threshold: f64) -> Vec<Vec<Fix<'a>>> {
    let mut clusters: Vec<Vec<Fix<'a>>> = Vec::new();
    for fix in fixes {
        let home = clusters.iter().position(|cluster| {
            cluster
                .iter()
                .any(|member| similarity_ratio(fix.normalized, member.normalized) >= threshold)
        });
        match home {
            Some(idx) => clusters[idx].push(*fix),
            None => clusters.push(vec![*fix]),
        }
    }
    clusters
}

fn merge_cluster(cluster: &[Fix<'_>]) -> Option<Entry> {
    let template = cluster.first()?.entry;
    let canonical = cluster
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            (a.success_count(), a.code().len())
                .cmp(&(b.success_count(), b.code().len()))
                .then(ib.cmp(ia))
        })
        .map_or(template, |(_, fix)| fix.entry);

    let total = cluster
        .iter()
        .fold(0u32, |sum, fix| sum.saturating_add(fix.success_count()));
    let tags: BTreeSet<&String> = cluster.iter().flat_map(|fix| fix.entry.tags()).collect();
    let result = cluster
        .iter()
        .map(|fix| fix.entry.result())
        .find(|result| result.contains(SOLVED_MARKER))
        .unwrap_or_else(|| canonical.result());
    let timestamp = cluster
        .iter()
        .map(|fix| fix.entry.timestamp())
        .max()
        .unwrap_or_else(|| template.timestamp());
    let error_type = if canonical.error_type().is_empty() {
        template.error_type()
    } else {
        canonical.error_type()
    };
    let explanation = if canonical.explanation().is_empty() {
        template.explanation()
    } else {
        canonical.explanation()
    };

    Some(
        template
            .to_builder()
            .error_type(error_type)
            .fix_code(canonical.fix_code())
            .explanation(explanation)
            .result(result)
            .success_count(total)
            .tags(tags.into_iter().cloned())
            .timestamp(timestamp)
            .build(),
    )
}

/// Strips `#` line comments and collapses whitespace.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.lines()
        .map(|line| line.find('#').map_or(line, |idx| &line[..idx]))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity of two fix codes after [`normalize_code`].
#[must_use]
pub fn fix_similarity(first: &str, second: &str) -> f64 {
    similarity_ratio(&normalize_code(first), &normalize_code(second))
}

/// Ratcliff/Obershelp ratio `2 * matches / total` over characters.
///
/// Every character takes part in matching, including very frequent ones in
/// long inputs, so long fixes sharing mostly punctuation score higher than
/// under a junk-filtering matcher.
///
/// Two empty strings are identical; one empty string matches nothing.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity_ratio(first: &str, second: &str) -> f64 {
    let a: Vec<char> = first.chars().collect();
    let b: Vec<char> = second.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, len) = longest_match(a, b, (a_lo, a_hi), (b_lo, b_hi));
        if len == 0 {
            continue;
        }
        matched += len;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + len < a_hi && j + len < b_hi {
            pending.push((i + len, a_hi, j + len, b_hi));
        }
    }
    matched
}

/// Earliest longest common run of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
fn longest_match(
    a: &[char],
    b: &[char],
    (a_lo, a_hi): (usize, usize),
    (b_lo, b_hi): (usize, usize),
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];
    let mut best = (a_lo, b_lo, 0);

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let col = j - b_lo + 1;
            current[col] = if a[i] == b[j] { previous[col - 1] + 1 } else { 0 };
            if current[col] > best.2 {
                let len = current[col];
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}
