//! Key-point lists: one `Label: detail` point per line.

use crate::inline::render_inline;

/// List decorations stripped from the start of a key point.
const POINT_PREFIXES: [&str; 3] = ["- ", "• ", "* "];

/// Format every non-blank line of `text` as a key-point fragment.
pub fn format_key_points(text: &str) -> Vec<String> {
    text.lines().filter_map(format_key_point).collect()
}

/// Format a single key point, or `None` if the line is blank.
///
/// Only the first colon splits label from detail; the detail keeps any
/// further colons verbatim. Lines without a colon, or with nothing after
/// it, render unchanged apart from inline markup.
pub fn format_key_point(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let line = POINT_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(*prefix))
        .map(str::trim_start)
        .unwrap_or(line);

    Some(match split_label(line) {
        Some((label, rest)) => format!(
            "<strong>{}:</strong>{}",
            render_inline(label),
            render_inline(rest)
        ),
        None => render_inline(line),
    })
}

/// Render key points as a `<ul>`; empty input renders nothing.
pub fn render_key_points(text: &str) -> String {
    render_points_list(&format_key_points(text))
}

/// Wrap already formatted key-point fragments in a `<ul>`.
pub fn render_points_list(points: &[String]) -> String {
    if points.is_empty() {
        return String::new();
    }

    let mut html = String::from(r#"<ul class="key-points">"#);
    for point in points {
        html.push_str("<li>");
        html.push_str(point);
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

const BOLD: &str = "**";

/// Split `label: rest` at the first colon outside bold markup.
///
/// A colon inside a bold span only splits where the span closes on it
/// (`**Demand:** up`, `**Load: peak**: high`); otherwise the line is left
/// whole (`**Note: big** drop`).
fn split_label(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;

    let (label, rest) = if line[..colon].matches(BOLD).count() % 2 == 0 {
        (&line[..colon], &line[colon + 1..])
    } else {
        let close = colon + line[colon..].find(BOLD)?;
        let after = &line[close + BOLD.len()..];
        if close == colon + 1 {
            (&line[..colon], after)
        } else {
            (&line[..close + BOLD.len()], after.strip_prefix(':')?)
        }
    };

    if rest.trim().is_empty() {
        return None;
    }
    Some((unwrap_bold(label), rest))
}

/// Drop the emphasis of a label that is one bold span, so it does not nest
/// inside the label's own `<strong>`. Labels with inner bold spans are kept.
fn unwrap_bold(label: &str) -> &str {
    let Some(inner) = label.strip_prefix(BOLD) else {
        return label;
    };
    let inner = inner.strip_suffix(BOLD).unwrap_or(inner);
    if inner.contains(BOLD) { label } else { inner }
}
