//! Process rules distilled from agent process issues.

use serde::{Deserialize, Serialize};

/// A generalized, actionable rule derived from one or more process issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRule {
    /// Short title.
    pub title: String,
    /// The rule statement.
    pub rule: String,
    /// Why the rule matters.
    pub why: String,
    /// Examples of following the rule.
    pub examples_good: Vec<String>,
    /// Examples of violating it.
    pub examples_bad: Vec<String>,
    /// Related error signatures or issue types.
    pub related_errors: Vec<String>,
}

impl ProcessRule {
    /// Maximum title length in characters.
    pub const MAX_TITLE_CHARS: usize = 200;
    /// Maximum rule and rationale length in characters.
    pub const MAX_TEXT_CHARS: usize = 500;
    /// Maximum examples kept per list.
    pub const MAX_EXAMPLES: usize = 5;
    /// Maximum related identifiers kept.
    pub const MAX_RELATED: usize = 10;

    /// Applies the length and count bounds.
    #[must_use]
    pub fn bounded(mut self) -> Self {
        self.title = truncate_chars(&self.title, Self::MAX_TITLE_CHARS);
        self.rule = truncate_chars(&self.rule, Self::MAX_TEXT_CHARS);
        self.why = truncate_chars(&self.why, Self::MAX_TEXT_CHARS);
        self.examples_good.truncate(Self::MAX_EXAMPLES);
        self.examples_bad.truncate(Self::MAX_EXAMPLES);
        self.related_errors.truncate(Self::MAX_RELATED);
        self
    }
}

/// Returns at most `max` characters of `text`, never splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
