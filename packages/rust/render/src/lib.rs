//! Report-content transformation pipeline.
//!
//! Turns a [`Report`] into HTML fragments keyed by page region. Every function
//! here is pure: rendering the same report twice yields identical output.
//!
//! Pipeline per report shape:
//! - monolithic: section splitter → line classifier → inline markup
//! - split: executive summary via the line classifier, analyses via the
//!   key-point formatter

mod inline;
mod key_points;
mod lines;
mod sections;

use serde::Serialize;
use tracing::{debug, instrument};

use powerni_shared::{Report, ReportContent, SplitContent, parse_generated_at};

pub use inline::{escape_html, render_inline};
pub use key_points::{
    format_key_point, format_key_points, render_key_points, render_points_list,
};
pub use lines::{RenderedLine, classify_line, classify_lines, render_block, render_line};
pub use sections::{
    LONG_TERM_MARKER, ReportSections, SECTION_DELIMITER, SHORT_TERM_MARKER, Section,
    parse_section, split_report_content, split_sections,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A report rendered to HTML-safe fragments. Every string field is safe to
/// insert into a document as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    /// Escaped subject line.
    pub subject: String,
    /// Human-readable generation time (en-GB), or the escaped raw value.
    pub generated_at: String,
    /// Region fragments for the report's content shape.
    pub body: RenderedBody,
    /// Escaped, trimmed, non-blank source lines.
    pub sources: Vec<String>,
}

/// Region fragments, one variant per report shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum RenderedBody {
    Monolithic {
        short_term_html: String,
        long_term_html: String,
    },
    Split {
        executive_summary_html: String,
        short_term_points: Vec<String>,
        long_term_points: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render a full report, dispatching on its content shape.
#[instrument(skip_all, fields(subject = %report.subject))]
pub fn render_report(report: &Report) -> RenderedReport {
    let body = match &report.content {
        ReportContent::Monolithic(text) => render_monolithic(text),
        ReportContent::Split(split) => render_split(split),
    };

    let sources: Vec<String> = report
        .source_lines()
        .into_iter()
        .map(escape_html)
        .collect();

    debug!(sources = sources.len(), "report rendered");

    RenderedReport {
        subject: escape_html(&report.subject),
        generated_at: format_report_timestamp(&report.generated_at),
        body,
        sources,
    }
}

/// Render monolithic report text into the short- and long-term regions.
pub fn render_monolithic(content: &str) -> RenderedBody {
    let sections = split_report_content(content);
    RenderedBody::Monolithic {
        short_term_html: render_block(&sections.short_term),
        long_term_html: render_block(&sections.long_term),
    }
}

/// Render pre-split content: summary as paragraphs, analyses as key points.
pub fn render_split(split: &SplitContent) -> RenderedBody {
    RenderedBody::Split {
        executive_summary_html: render_block(&split.executive_summary),
        short_term_points: format_key_points(&split.short_term_analysis),
        long_term_points: format_key_points(&split.long_term_analysis),
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Format a report timestamp as `Monday 15 January 2024 at 10:30`.
///
/// Unparseable input is shown escaped but otherwise untouched.
pub fn format_report_timestamp(raw: &str) -> String {
    match parse_generated_at(raw) {
        Some(dt) => dt.format("%A %-d %B %Y at %H:%M").to_string(),
        None => escape_html(raw),
    }
}

/// Format a subscription timestamp as `15/01/2024, 10:30:00`.
pub fn format_entry_timestamp(raw: &str) -> String {
    match parse_generated_at(raw) {
        Some(dt) => dt.format("%d/%m/%Y, %H:%M:%S").to_string(),
        None => escape_html(raw),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
