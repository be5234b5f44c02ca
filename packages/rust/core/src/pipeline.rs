//! End-to-end `render` pipeline: report source → load → render → page → disk.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use powerni_render::{RenderedReport, Section, render_report, split_sections};
use powerni_shared::{AppConfig, Report, ReportContent, Result, expand_home};
use powerni_storage::Storage;

use crate::loader::{FetchOptions, ReportSource, ReportState, load_report_state};
use crate::page::{PageOptions, assemble_page, write_page};
use crate::subscription::{SubscriptionError, SubscriptionStore};

/// Configuration for the `render` pipeline.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Where the report JSON lives.
    pub source: ReportSource,
    pub fetch: FetchOptions,
    pub page: PageOptions,
    /// Output HTML file; `None` skips writing.
    pub out: Option<PathBuf>,
    /// Subscription database, read only for the subscriber count.
    pub db_path: PathBuf,
    pub collection: String,
}

impl RenderConfig {
    /// Resolve a render config from the app config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            source: ReportSource::parse(&config.report.source)?,
            fetch: FetchOptions::from(&config.report),
            page: PageOptions::from(&config.page),
            out: None,
            db_path: expand_home(&config.newsletter.db_path)?,
            collection: config.newsletter.collection.clone(),
        })
    }
}

/// Result of the `render` pipeline.
#[derive(Debug)]
pub struct RenderResult {
    pub state: ReportState,
    /// Rendered fragments when the report loaded.
    pub rendered: Option<RenderedReport>,
    /// The assembled page.
    pub html: String,
    pub subscriber_count: Option<usize>,
    /// Where the page was written, if anywhere.
    pub written_to: Option<PathBuf>,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RenderResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &RenderResult) {}
}

/// Run the full `render` pipeline.
///
/// 1. Load the report (with retry)
/// 2. Count subscribers (degrades to "unavailable")
/// 3. Render fragments and assemble the page
/// 4. Write the page, if an output path is set
///
/// A report that fails to load still produces a page describing the failure.
#[instrument(skip_all, fields(source = %config.source))]
pub async fn render_site(
    config: &RenderConfig,
    progress: &dyn ProgressReporter,
) -> Result<RenderResult> {
    let start = Instant::now();

    progress.phase("Loading report");
    let state = load_report_state(&config.source, &config.fetch).await;
    if let ReportState::Failed { message, attempts } = &state {
        warn!(attempts, error = %message, "report unavailable, rendering error page");
    }

    progress.phase("Reading subscriptions");
    let subscriber_count = subscriber_count(&config.db_path, &config.collection).await;

    progress.phase("Rendering page");
    let rendered = match &state {
        ReportState::Ready(report) => Some(render_report(report)),
        _ => None,
    };
    let html = assemble_page(&state, &config.page, subscriber_count);

    let written_to = match &config.out {
        Some(path) => {
            progress.phase("Writing page");
            write_page(path, &html)?;
            Some(path.clone())
        }
        None => None,
    };

    let result = RenderResult {
        state,
        rendered,
        html,
        subscriber_count,
        written_to,
        elapsed: start.elapsed(),
    };

    info!(
        ready = matches!(result.state, ReportState::Ready(_)),
        subscribers = ?result.subscriber_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "render pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Number of stored subscriptions; `None` if the list cannot be read.
///
/// A database that does not exist yet means nobody has subscribed.
pub async fn subscriber_count(db_path: &Path, collection: &str) -> Option<usize> {
    if !db_path.exists() {
        return Some(0);
    }

    let storage = match Storage::open_readonly(db_path).await {
        Ok(storage) => storage,
        Err(e) => {
            warn!(path = %db_path.display(), error = %e, "cannot open subscription database");
            return None;
        }
    };

    match SubscriptionStore::load(storage, collection).await {
        Ok(subs) => Some(subs.len().await),
        Err(e) => {
            warn!(error = %e, "cannot read subscriptions");
            None
        }
    }
}

/// Open the subscription list for writing.
pub async fn open_subscriptions(
    db_path: &Path,
    collection: &str,
) -> std::result::Result<SubscriptionStore<Storage>, SubscriptionError> {
    let storage = Storage::open(db_path)
        .await
        .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;
    SubscriptionStore::load(storage, collection).await
}

/// Open the subscription list read-only; a missing database is an empty list.
pub async fn read_subscriptions(
    db_path: &Path,
    collection: &str,
) -> std::result::Result<Vec<powerni_shared::SubscriptionEntry>, SubscriptionError> {
    if !db_path.exists() {
        return Ok(Vec::new());
    }
    let storage = Storage::open_readonly(db_path)
        .await
        .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;
    Ok(SubscriptionStore::load(storage, collection).await?.entries().await)
}

/// Titled sections of a report, in document order.
pub fn report_outline(report: &Report) -> Vec<Section> {
    match &report.content {
        ReportContent::Monolithic(text) => split_sections(text),
        ReportContent::Split(split) => [
            ("Executive Summary", &split.executive_summary),
            ("Short-Term Outlook", &split.short_term_analysis),
            ("Long-Term Outlook", &split.long_term_analysis),
        ]
        .into_iter()
        .filter(|(_, body)| !body.trim().is_empty())
        .map(|(title, body)| Section {
            title: title.to_string(),
            body: body.trim().to_string(),
        })
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerni_shared::DEFAULT_COLLECTION;
    use uuid::Uuid;

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("powerni_{name}_{}", Uuid::now_v7()))
    }

    fn config_for(source: ReportSource) -> RenderConfig {
        RenderConfig {
            source,
            fetch: FetchOptions {
                timeout_secs: 5,
                max_attempts: 2,
                retry_backoff_ms: 1,
            },
            page: PageOptions::default(),
            out: Some(temp_path("site").join("index.html")),
            db_path: temp_path("db").with_extension("db"),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    #[tokio::test]
    async fn renders_fixture_to_disk() {
        let config = config_for(ReportSource::File(fixture_path("json/report.monolithic.json")));
        let result = render_site(&config, &SilentProgress).await.expect("render");

        assert!(matches!(result.state, ReportState::Ready(_)));
        assert!(result.rendered.is_some());
        assert_eq!(result.subscriber_count, Some(0));

        let written = std::fs::read_to_string(result.written_to.unwrap()).unwrap();
        assert_eq!(written, result.html);
        assert!(written.contains("Short-Term Analysis"));
    }

    #[tokio::test]
    async fn missing_report_still_writes_error_page() {
        let config = config_for(ReportSource::File(fixture_path("json/nope.json")));
        let result = render_site(&config, &SilentProgress).await.expect("render");

        assert!(matches!(
            result.state,
            ReportState::Failed { attempts: 2, .. }
        ));
        assert!(result.rendered.is_none());
        assert!(result.html.contains("report-error"));
    }

    #[tokio::test]
    async fn subscriber_count_reflects_store() {
        let db = temp_path("count").with_extension("db");
        assert_eq!(subscriber_count(&db, DEFAULT_COLLECTION).await, Some(0));

        let subs = open_subscriptions(&db, DEFAULT_COLLECTION).await.unwrap();
        subs.submit("a@b.com").await.unwrap();
        subs.submit("c@d.com").await.unwrap();
        drop(subs);

        assert_eq!(subscriber_count(&db, DEFAULT_COLLECTION).await, Some(2));
        let entries = read_subscriptions(&db, DEFAULT_COLLECTION).await.unwrap();
        assert_eq!(entries[1].email, "c@d.com");
    }

    #[tokio::test]
    async fn corrupt_subscriptions_degrade_to_unavailable() {
        let db = temp_path("corrupt").with_extension("db");
        let storage = Storage::open(&db).await.unwrap();
        powerni_storage::KeyValueStore::put(&storage, DEFAULT_COLLECTION, "not json")
            .await
            .unwrap();
        drop(storage);

        assert_eq!(subscriber_count(&db, DEFAULT_COLLECTION).await, None);
    }

    #[test]
    fn outline_of_split_report_skips_empty_parts() {
        let raw = std::fs::read_to_string(fixture_path("json/report.split.json")).unwrap();
        let mut report: Report = serde_json::from_str(&raw).unwrap();
        if let ReportContent::Split(split) = &mut report.content {
            split.long_term_analysis.clear();
        }
        let titles: Vec<String> = report_outline(&report).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Executive Summary", "Short-Term Outlook"]);
    }

    #[test]
    fn outline_of_monolithic_report() {
        let raw = std::fs::read_to_string(fixture_path("json/report.monolithic.json")).unwrap();
        let report: Report = serde_json::from_str(&raw).unwrap();
        let titles: Vec<String> = report_outline(&report).into_iter().map(|s| s.title).collect();
        assert!(titles.contains(&"Short-Term Analysis".to_string()));
        assert!(titles.contains(&"Long-Term Analysis".to_string()));
    }
}
