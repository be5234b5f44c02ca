//! Inline markup: `**emphasis**` and `[n]` citation markers.
//!
//! Text is HTML-escaped first, then the two substitutions run in a fixed
//! order. Neither pattern contains an escapable character, so escaping
//! never breaks a marker and the substitutions never see raw markup.

use std::sync::LazyLock;

use regex::Regex;

/// Non-greedy `**…**`, one line at a time.
static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("strong regex"));

/// `[n]` with one or more digits.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("citation regex"));

/// Render a plain-text fragment to HTML with inline markup expanded.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let strong = STRONG_RE.replace_all(&escaped, "<strong>$1</strong>");
    CITATION_RE
        .replace_all(&strong, r#"<span class="source-link">[$1]</span>"#)
        .into_owned()
}

/// Escape the five HTML metacharacters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_and_citation() {
        assert_eq!(
            render_inline("**Load** rose [3]"),
            r#"<strong>Load</strong> rose <span class="source-link">[3]</span>"#
        );
    }

    #[test]
    fn emphasis_is_non_greedy() {
        assert_eq!(
            render_inline("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn unmatched_markers_pass_through() {
        assert_eq!(render_inline("5 ** 2 and [x]"), "5 ** 2 and [x]");
        assert_eq!(render_inline("[12a]"), "[12a]");
    }

    #[test]
    fn multi_digit_citation() {
        assert_eq!(
            render_inline("see [12]"),
            r#"see <span class="source-link">[12]</span>"#
        );
    }

    #[test]
    fn hostile_markup_is_escaped() {
        let out = render_inline(r#"<script>alert("x")</script> **bold & brave**"#);
        assert!(!out.contains("<script>"));
        assert!(out.starts_with("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"));
        assert!(out.ends_with("<strong>bold &amp; brave</strong>"));
    }

    #[test]
    fn escape_html_escapes_special_chars() {
        assert_eq!(escape_html("a < b > c"), "a &lt; b &gt; c");
        assert_eq!(escape_html("it's"), "it&#x27;s");
        assert_eq!(escape_html("plain"), "plain");
    }
}
