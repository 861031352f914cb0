//! Markdown escaping and formatting helpers shared by the generator and the
//! reverse parsers.

use chrono::{DateTime, Utc};

/// Characters escaped with a backslash in heading text.
///
/// The backslash itself is part of the set so that unescaping is exact.
pub const ESCAPED_CHARS: &[char] = &[
    '\\', '#', '*', '[', ']', '(', ')', '<', '>', '`', '_', '~',
];

/// Heading text rendered for an empty signature.
pub const UNTITLED: &str = "(untitled)";

/// Backslash-escapes every markdown-structural character.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ESCAPED_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Inverse of [`escape_markdown`].
///
/// A backslash before a character outside [`ESCAPED_CHARS`] is kept.
pub fn unescape_markdown(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if ESCAPED_CHARS.contains(&next) {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }
    unescaped
}

/// Escaped, single-line heading text; empty input becomes [`UNTITLED`].
pub fn heading_text(text: &str) -> String {
    if text.is_empty() {
        return UNTITLED.to_string();
    }
    escape_markdown(&text.replace(['\r', '\n'], " "))
}

/// Inverse of [`heading_text`].
pub fn parse_heading_text(text: &str) -> String {
    if text == UNTITLED {
        String::new()
    } else {
        unescape_markdown(text)
    }
}

/// `2025-01-15T10:30:00Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `2025-01-15`.
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `` `a`, `b` ``.
pub fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("`{tag}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A backtick fence longer than any backtick run inside `code`.
pub fn fence_for(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_escape_structural_characters() {
        assert_eq!(
            escape_markdown("## [x](y) *z* <b> `c` _u_ ~s~"),
            r"\#\# \[x\]\(y\) \*z\* \<b\> \`c\` \_u\_ \~s\~"
        );
    }

    #[test_case("plain text")]
    #[test_case(r"C:\path\file_name.py")]
    #[test_case("### Error: injected")]
    #[test_case(r"already \# escaped")]
    fn test_unescape_inverts_escape(text: &str) {
        assert_eq!(unescape_markdown(&escape_markdown(text)), text);
    }

    #[test]
    fn test_unescape_keeps_unknown_escapes() {
        assert_eq!(unescape_markdown(r"a\nb"), r"a\nb");
    }

    #[test]
    fn test_heading_text_untitled_round_trip() {
        assert_eq!(heading_text(""), UNTITLED);
        assert_eq!(parse_heading_text(UNTITLED), "");
        assert_eq!(heading_text("(untitled)"), r"\(untitled\)");
        assert_eq!(parse_heading_text(r"\(untitled\)"), "(untitled)");
    }

    #[test]
    fn test_fence_for() {
        assert_eq!(fence_for("x = 1"), "```");
        assert_eq!(fence_for("```\ninner\n```"), "````");
    }

    #[test]
    fn test_format_tags() {
        let tags = vec!["docker".to_string(), "file-io".to_string()];
        assert_eq!(format_tags(&tags), "`docker`, `file-io`");
    }
}
