//! Full-page HTML assembly.
//!
//! Wraps rendered report fragments in the page shell: header, analysis
//! sections, newsletter block and sources list.

use std::path::Path;

use tracing::{debug, instrument};

use powerni_render::{RenderedBody, RenderedReport, escape_html, render_points_list, render_report};
use powerni_shared::{PageConfig, PowerniError, Result};

use crate::loader::ReportState;

/// Page-level text that does not come from the report.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub subtitle: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::from(&PageConfig::default())
    }
}

impl From<&PageConfig> for PageOptions {
    fn from(config: &PageConfig) -> Self {
        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
        }
    }
}

/// Build a complete HTML document for `state`.
///
/// `subscriber_count` is `None` when the subscription list could not be read.
#[instrument(skip_all)]
pub fn assemble_page(
    state: &ReportState,
    opts: &PageOptions,
    subscriber_count: Option<usize>,
) -> String {
    let main = match state {
        ReportState::Loading => loading_body(),
        ReportState::Failed { message, attempts } => failed_body(opts, message, *attempts),
        ReportState::Ready(report) => {
            let rendered = render_report(report);
            report_body(&rendered, opts, subscriber_count)
        }
    };

    let html = document(&opts.title, &main);
    debug!(bytes = html.len(), "page assembled");
    html
}

/// Write an assembled page, creating parent directories.
pub fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PowerniError::io(parent, e))?;
    }
    std::fs::write(path, html).map_err(|e| PowerniError::io(path, e))
}

// ---------------------------------------------------------------------------
// Page parts
// ---------------------------------------------------------------------------

fn document(title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en-GB\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{main}\n</body>\n</html>\n",
        escape_html(title)
    )
}

fn loading_body() -> String {
    "<div class=\"loading\"><p>Loading...</p></div>".to_string()
}

fn failed_body(opts: &PageOptions, message: &str, attempts: u32) -> String {
    let mut out = String::from("<main class=\"report-container\">\n<div class=\"report-content\">\n");
    out.push_str(&header_section(opts, None, None));
    out.push_str(&format!(
        "<section class=\"section report-error\">\n\
         <h2 class=\"section-title\">Report unavailable</h2>\n\
         <p>The report could not be loaded after {attempts} attempt{}.</p>\n\
         <p class=\"error-detail\">{}</p>\n</section>\n",
        if attempts == 1 { "" } else { "s" },
        escape_html(message)
    ));
    out.push_str("</div>\n</main>");
    out
}

fn report_body(
    rendered: &RenderedReport,
    opts: &PageOptions,
    subscriber_count: Option<usize>,
) -> String {
    let mut out = String::from("<main class=\"report-container\">\n<div class=\"report-content\">\n");
    out.push_str(&header_section(
        opts,
        Some(&rendered.generated_at),
        Some(&rendered.subject),
    ));

    match &rendered.body {
        RenderedBody::Monolithic {
            short_term_html,
            long_term_html,
        } => {
            out.push_str(&analysis_section("Short-Term Analysis", short_term_html));
            out.push_str(&analysis_section("Long-Term Analysis", long_term_html));
        }
        RenderedBody::Split {
            executive_summary_html,
            short_term_points,
            long_term_points,
        } => {
            out.push_str(&analysis_section("Executive Summary", executive_summary_html));
            out.push_str(&analysis_section(
                "Short-Term Outlook",
                &render_points_list(short_term_points),
            ));
            out.push_str(&analysis_section(
                "Long-Term Outlook",
                &render_points_list(long_term_points),
            ));
        }
    }

    out.push_str(&newsletter_section(subscriber_count));
    out.push_str(&sources_block(&rendered.sources));
    out.push_str("</div>\n</main>");
    out
}

/// `generated_at` and `subject` are already escaped.
fn header_section(opts: &PageOptions, generated_at: Option<&str>, subject: Option<&str>) -> String {
    let mut out = format!(
        "<section class=\"section header-section\">\n\
         <h1 class=\"report-title\">{}</h1>\n\
         <p class=\"report-subtitle\">{}</p>\n",
        escape_html(&opts.title),
        escape_html(&opts.subtitle)
    );
    if let Some(ts) = generated_at {
        out.push_str(&format!("<p class=\"report-timestamp\">{ts}</p>\n"));
    }
    if let Some(subject) = subject {
        out.push_str(&format!("<p class=\"report-subject\">{subject}</p>\n"));
    }
    out.push_str("</section>\n");
    out
}

/// Sections with no content are left out.
fn analysis_section(title: &str, body_html: &str) -> String {
    if body_html.is_empty() {
        return String::new();
    }
    format!(
        "<section class=\"section\">\n<h2 class=\"section-title\">{title}</h2>\n\
         <div class=\"report-section\">{body_html}</div>\n</section>\n"
    )
}

fn newsletter_section(subscriber_count: Option<usize>) -> String {
    let count = match subscriber_count {
        Some(n) => format!("Subscribed Emails ({n})"),
        None => "Subscriber count unavailable".to_string(),
    };
    format!(
        "<section class=\"section newsletter-section\">\n\
         <h2 class=\"section-title\">Stay Updated</h2>\n\
         <form class=\"newsletter-form\">\n\
         <label for=\"email\">Subscribe to receive market insights directly in your inbox</label>\n\
         <input type=\"email\" id=\"email\" name=\"email\" placeholder=\"Enter your email address...\" required>\n\
         <button type=\"submit\">Subscribe Now</button>\n\
         </form>\n\
         <p class=\"subscriber-count\">{count}</p>\n\
         </section>\n"
    )
}

/// `sources` are already escaped and non-blank.
fn sources_block(sources: &[String]) -> String {
    let mut out = String::from("<div class=\"sources\">\n");
    for source in sources {
        out.push_str(&format!("<div class=\"source-link\">{source}</div>\n"));
    }
    out.push_str("</div>\n");
    out
}
