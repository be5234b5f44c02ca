//! Plain-text report ingestion: `latest.txt` → `report.json`.
//!
//! The text layout is blocks separated by blank lines:
//! subject, content blocks…, a footer block, and the sources block last.
//! The footer (second to last block) is dropped.

use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use powerni_shared::{PowerniError, Report, ReportContent, Result};

/// Separator between text blocks.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Build a [`Report`] from plain report text.
pub fn report_from_text(text: &str, generated_at: NaiveDateTime) -> Result<Report> {
    let text = text.replace("\r\n", "\n");
    let blocks: Vec<&str> = text.split(BLOCK_SEPARATOR).collect();

    if blocks.len() < 2 {
        return Err(PowerniError::validation(
            "report text needs at least a subject block and a sources block",
        ));
    }

    let subject = blocks[0].trim();
    if subject.is_empty() {
        return Err(PowerniError::validation("report text has an empty subject"));
    }

    let content = blocks
        .get(1..blocks.len() - 2)
        .map(|body| body.join(BLOCK_SEPARATOR))
        .unwrap_or_default();

    let sources = blocks[blocks.len() - 1].trim();

    Ok(Report {
        subject: subject.to_string(),
        content: ReportContent::Monolithic(content),
        sources: sources.to_string(),
        generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    })
}

/// Write a report as pretty JSON, creating parent directories.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PowerniError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| PowerniError::parse(format!("failed to serialize report: {e}")))?;
    std::fs::write(path, json).map_err(|e| PowerniError::io(path, e))
}

/// Read `input`, convert it, and write the JSON to every path in `outputs`.
#[instrument(skip_all, fields(input = %input.display(), outputs = outputs.len()))]
pub fn generate_report_files(
    input: &Path,
    outputs: &[impl AsRef<Path>],
    generated_at: NaiveDateTime,
) -> Result<Report> {
    let text = std::fs::read_to_string(input).map_err(|e| PowerniError::io(input, e))?;
    let report = report_from_text(&text, generated_at)?;

    for out in outputs {
        write_report(out.as_ref(), &report)?;
        info!(path = %out.as_ref().display(), "report JSON written");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_micro_opt(10, 30, 0, 123_456))
            .expect("valid timestamp")
    }

    fn fixture_path(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    #[test]
    fn splits_subject_content_and_sources() {
        let text = "Subject line\n\nBody one\n\nBody two\n\nFooter\n\n[1] Source\n[2] Other\n";
        let report = report_from_text(text, fixed_time()).unwrap();
        assert_eq!(report.subject, "Subject line");
        assert_eq!(
            report.content,
            ReportContent::Monolithic("Body one\n\nBody two".into())
        );
        assert_eq!(report.sources, "[1] Source\n[2] Other");
        assert_eq!(report.generated_at, "2024-01-15T10:30:00.123456");
    }

    #[test]
    fn two_blocks_have_empty_content() {
        let report = report_from_text("Subject\n\nSources", fixed_time()).unwrap();
        assert_eq!(report.content, ReportContent::Monolithic(String::new()));
        assert_eq!(report.sources, "Sources");
    }

    #[test]
    fn single_block_is_rejected() {
        let err = report_from_text("Only a subject", fixed_time()).unwrap_err();
        assert!(err.to_string().contains("sources block"));
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        let text = "Subject\r\n\r\nBody\r\n\r\nFooter\r\n\r\nSources";
        let report = report_from_text(text, fixed_time()).unwrap();
        assert_eq!(report.content, ReportContent::Monolithic("Body".into()));
    }

    #[test]
    fn fixture_text_keeps_section_delimiters() {
        let text = std::fs::read_to_string(fixture_path("text/latest.txt")).unwrap();
        let report = report_from_text(&text, fixed_time()).unwrap();

        let ReportContent::Monolithic(content) = &report.content else {
            panic!("expected monolithic content");
        };
        assert!(content.contains("---"));
        assert!(content.contains("**Long-Term Analysis**"));
        assert!(!content.contains("Generated by the weekly market pipeline"));
        assert_eq!(report.source_lines().len(), 3);
    }

    #[test]
    fn generate_writes_every_output() {
        let dir = std::env::temp_dir().join(format!("powerni_gen_{}", uuid::Uuid::now_v7()));
        let outputs = [dir.join("a/report.json"), dir.join("b/report.json")];

        let report =
            generate_report_files(&fixture_path("text/latest.txt"), &outputs, fixed_time())
                .unwrap();

        for out in &outputs {
            let written: Report =
                serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
            assert_eq!(written, report);
        }
    }
}
