//! Section splitting for monolithic report bodies.
//!
//! Sections are separated by a literal `---` line and labelled with a bold
//! heading such as `**Short-Term Analysis**:`. Missing markers never fail;
//! the affected section just comes back empty.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Literal delimiter between report sections.
pub const SECTION_DELIMITER: &str = "---";

/// Marker text introducing the short-term analysis.
pub const SHORT_TERM_MARKER: &str = "Short-Term Analysis";

/// Marker text introducing the long-term analysis.
pub const LONG_TERM_MARKER: &str = "Long-Term Analysis";

/// The two analysis bodies of a monolithic report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSections {
    pub short_term: String,
    pub long_term: String,
}

/// A titled section: first line is the title, the rest is the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Extract the short-term and long-term bodies from monolithic report text.
///
/// Each body is the text following its marker in the first `---` segment that
/// contains the marker, minus the label's trailing `**` / `:` decoration.
pub fn split_report_content(content: &str) -> ReportSections {
    let segments = segments(content);

    let sections = ReportSections {
        short_term: text_after_marker(&segments, SHORT_TERM_MARKER),
        long_term: text_after_marker(&segments, LONG_TERM_MARKER),
    };

    debug!(
        segments = segments.len(),
        short_term_len = sections.short_term.len(),
        long_term_len = sections.long_term.len(),
        "split report content"
    );

    sections
}

/// Split every `---` segment into a titled [`Section`], skipping untitled ones.
pub fn split_sections(content: &str) -> Vec<Section> {
    segments(content).into_iter().filter_map(parse_section).collect()
}

/// Parse one segment: the first line (without `**…**:` decoration) is the title.
///
/// Returns `None` when the title is empty after stripping.
pub fn parse_section(text: &str) -> Option<Section> {
    static TITLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\*\*(.*?)\*\*:?").expect("section title regex"));

    let text = text.trim();
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));

    let title = TITLE_RE.replace(first.trim(), "$1");
    let title = title.trim().trim_end_matches(':').trim_end();
    if title.is_empty() {
        return None;
    }

    Some(Section {
        title: title.to_string(),
        body: rest.trim().to_string(),
    })
}

fn segments(content: &str) -> Vec<&str> {
    content.split(SECTION_DELIMITER).map(str::trim).collect()
}

fn text_after_marker(segments: &[&str], marker: &str) -> String {
    segments
        .iter()
        .find_map(|segment| segment.split_once(marker).map(|(_, rest)| rest))
        .map(|rest| {
            rest.trim_start_matches('*')
                .trim_start_matches([' ', '\t'])
                .trim_start_matches(':')
                .trim_start_matches('*')
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}
