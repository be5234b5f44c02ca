//! Core domain types for PowerNI reports and newsletter subscriptions.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Store key under which subscription entries are kept.
pub const DEFAULT_COLLECTION: &str = "newsletterEmails";

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The `report.json` document produced by the report generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// One-line subject of the report.
    pub subject: String,
    /// Report body, in one of the two supported shapes.
    pub content: ReportContent,
    /// Newline-separated list of sources.
    pub sources: String,
    /// ISO-8601 generation time. May lack an offset.
    pub generated_at: String,
}

impl Report {
    /// Non-blank source lines, trimmed, in document order.
    pub fn source_lines(&self) -> Vec<&str> {
        self.sources
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Shape of a report body, resolved once when the document is deserialized.
///
/// A plain string is the monolithic variant; an object carries the pre-split fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportContent {
    /// Long text with `---` delimited, marker-labelled sections.
    Monolithic(String),
    /// Summary and analyses delivered as separate fields.
    Split(SplitContent),
}

/// Pre-split report body. Missing fields read as empty text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitContent {
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub short_term_analysis: String,
    #[serde(default)]
    pub long_term_analysis: String,
}

/// Parse a report timestamp.
///
/// Accepts RFC 3339 (kept in its own offset) and the naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form the generator writes.
pub fn parse_generated_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

// ---------------------------------------------------------------------------
// SubscriptionEntry
// ---------------------------------------------------------------------------

/// One subscribed email address with its submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEntry {
    pub email: String,
    /// ISO-8601 submission time.
    pub timestamp: String,
}
