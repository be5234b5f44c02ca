//! Line classification and block rendering.
//!
//! Classification looks only at the leading characters of the trimmed line.
//! Numbering is decoration: items are never renumbered or checked for order.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::inline::render_inline;

/// Bullet prefixes recognized at the start of a trimmed line.
const BULLET_PREFIXES: [&str; 2] = ["- ", "• "];

/// `N. rest` at the start of a trimmed line.
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\. (.*)$").expect("numbered item regex"));

/// A single classified physical line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderedLine {
    /// Anything else, kept verbatim (may be blank).
    Paragraph(String),
    /// `- item` / `• item`, prefix removed.
    Bullet(String),
    /// `N. text`; `number` is rendered as a visible tag.
    NumberedItem { number: u64, text: String },
}

/// Classify one line.
pub fn classify_line(line: &str) -> RenderedLine {
    let trimmed = line.trim();

    if let Some(rest) = BULLET_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(*prefix))
    {
        return RenderedLine::Bullet(rest.to_string());
    }

    if let Some(caps) = NUMBERED_RE.captures(trimmed) {
        // Digit runs too long for u64 are not list numbers.
        if let Ok(number) = caps[1].parse::<u64>() {
            return RenderedLine::NumberedItem {
                number,
                text: caps[2].to_string(),
            };
        }
    }

    RenderedLine::Paragraph(line.to_string())
}

/// Classify every line of a block, preserving order.
pub fn classify_lines(text: &str) -> Vec<RenderedLine> {
    text.lines().map(classify_line).collect()
}

/// Render one classified line, or `None` for a blank paragraph.
pub fn render_line(line: &RenderedLine) -> Option<String> {
    match line {
        RenderedLine::Paragraph(text) if text.trim().is_empty() => None,
        RenderedLine::Paragraph(text) => Some(format!("<p>{}</p>", render_inline(text))),
        RenderedLine::Bullet(text) => Some(format!(
            r#"<p class="bullet-point">• {}</p>"#,
            render_inline(text)
        )),
        RenderedLine::NumberedItem { number, text } => Some(format!(
            r#"<p><span class="number">{number}.</span> {}</p>"#,
            render_inline(text)
        )),
    }
}

/// Render a block of report text to a sequence of `<p>` elements.
pub fn render_block(text: &str) -> String {
    classify_lines(text)
        .iter()
        .filter_map(render_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_bullet() {
        assert_eq!(classify_line("- item"), RenderedLine::Bullet("item".into()));
        assert_eq!(
            classify_line("   - indented item  "),
            RenderedLine::Bullet("indented item".into())
        );
    }

    #[test]
    fn glyph_bullet() {
        assert_eq!(classify_line("• item"), RenderedLine::Bullet("item".into()));
    }

    #[test]
    fn numbered_item() {
        assert_eq!(
            classify_line("1. first"),
            RenderedLine::NumberedItem {
                number: 1,
                text: "first".into()
            }
        );
        assert_eq!(
            classify_line("  12. twelfth"),
            RenderedLine::NumberedItem {
                number: 12,
                text: "twelfth".into()
            }
        );
    }

    #[test]
    fn paragraph_fallbacks() {
        assert_eq!(classify_line(""), RenderedLine::Paragraph("".into()));
        assert_eq!(classify_line("-dash"), RenderedLine::Paragraph("-dash".into()));
        assert_eq!(classify_line("1.5 GW"), RenderedLine::Paragraph("1.5 GW".into()));
        assert_eq!(
            classify_line("**bold** start"),
            RenderedLine::Paragraph("**bold** start".into())
        );
    }

    #[test]
    fn oversized_number_is_paragraph() {
        let line = "123456789012345678901234567890. huge";
        assert_eq!(classify_line(line), RenderedLine::Paragraph(line.into()));
    }

    #[test]
    fn paragraph_keeps_original_whitespace() {
        assert_eq!(
            classify_line("  spaced  "),
            RenderedLine::Paragraph("  spaced  ".into())
        );
    }

    #[test]
    fn classify_lines_preserves_order() {
        let lines = classify_lines("intro\n- a\n2. b\n");
        assert_eq!(
            lines,
            vec![
                RenderedLine::Paragraph("intro".into()),
                RenderedLine::Bullet("a".into()),
                RenderedLine::NumberedItem {
                    number: 2,
                    text: "b".into()
                },
            ]
        );
    }

    #[test]
    fn render_block_filters_blank_lines() {
        let html = render_block("**Load** rose [3]\n\n   \n- peak\n1. first");
        assert_eq!(
            html,
            "<p><strong>Load</strong> rose <span class=\"source-link\">[3]</span></p>\
             <p class=\"bullet-point\">• peak</p>\
             <p><span class=\"number\">1.</span> first</p>"
        );
    }

    #[test]
    fn render_block_empty_input() {
        assert_eq!(render_block(""), "");
    }

    #[test]
    fn numbers_are_not_renumbered() {
        let html = render_block("3. c\n1. a");
        assert!(html.find("3.").unwrap() < html.find("1.").unwrap());
    }
}
