//! Report loading: local file or http(s) URL, with bounded retry.
//!
//! A report that cannot be loaded ends up as [`ReportState::Failed`] so the
//! page can say so, rather than sitting in the loading state forever.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;

use powerni_shared::{PowerniError, Report, ReportConfig, Result, expand_home};

/// User-Agent string for report requests.
const USER_AGENT: &str = concat!("PowerNI/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ReportSource
// ---------------------------------------------------------------------------

/// Where a report document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    Url(Url),
    File(PathBuf),
}

impl ReportSource {
    /// `http://` / `https://` become URLs; anything else is a file path.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PowerniError::validation("report source is empty"));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).map_err(|e| {
                PowerniError::validation(format!("invalid report URL '{raw}': {e}"))
            })?;
            return Ok(Self::Url(url));
        }

        Ok(Self::File(expand_home(raw)?))
    }
}

impl std::fmt::Display for ReportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Options and state
// ---------------------------------------------------------------------------

/// Retry and timeout settings for loading a report.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout in seconds (URLs only).
    pub timeout_secs: u64,
    /// Total attempts; values below 1 still make one attempt.
    pub max_attempts: u32,
    /// Attempt `n` is followed by a `n * retry_backoff_ms` pause.
    pub retry_backoff_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl From<&ReportConfig> for FetchOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_attempts: config.max_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }
}

/// What the view knows about the report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    /// Nothing loaded yet.
    Loading,
    Ready(Report),
    /// Every attempt failed; `message` is the last error.
    Failed { message: String, attempts: u32 },
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and parse a report, retrying transient failures.
pub async fn load_report(source: &ReportSource, opts: &FetchOptions) -> Result<Report> {
    load_with_retry(source, opts).await.0
}

/// Load a report and fold the outcome into a [`ReportState`].
pub async fn load_report_state(source: &ReportSource, opts: &FetchOptions) -> ReportState {
    match load_with_retry(source, opts).await {
        (Ok(report), _) => ReportState::Ready(report),
        (Err(e), attempts) => ReportState::Failed {
            message: e.to_string(),
            attempts,
        },
    }
}

/// Returns the outcome and the number of attempts made.
#[instrument(skip_all, fields(source = %source))]
async fn load_with_retry(source: &ReportSource, opts: &FetchOptions) -> (Result<Report>, u32) {
    let client = match source {
        ReportSource::Url(_) => match build_client(opts) {
            Ok(client) => Some(client),
            Err(e) => return (Err(e), 0),
        },
        ReportSource::File(_) => None,
    };

    let max_attempts = opts.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match fetch_once(source, client.as_ref()).await {
            Ok(report) => {
                info!(attempt, subject = %report.subject, "report loaded");
                return (Ok(report), attempt);
            }
            Err(e) => {
                // A document that parses badly will parse badly next time too.
                let retryable = e.is_transient();
                warn!(attempt, max_attempts, retryable, error = %e, "report load failed");

                if !retryable || attempt >= max_attempts {
                    return (Err(e), attempt);
                }

                let pause = opts.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(pause)).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once(source: &ReportSource, client: Option<&Client>) -> Result<Report> {
    let body = match (source, client) {
        (ReportSource::File(path), _) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PowerniError::io(path, e))?,
        (ReportSource::Url(url), Some(client)) => fetch_text(client, url).await?,
        (ReportSource::Url(url), None) => {
            return Err(PowerniError::Network(format!("{url}: no HTTP client")));
        }
    };

    serde_json::from_str(&body).map_err(|e| PowerniError::parse(format!("{source}: {e}")))
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| PowerniError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| PowerniError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PowerniError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| PowerniError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerni_shared::ReportContent;

    fn fixture_path(name: &str) -> PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn fast_retry(max_attempts: u32) -> FetchOptions {
        FetchOptions {
            timeout_secs: 5,
            max_attempts,
            retry_backoff_ms: 1,
        }
    }

    #[test]
    fn fetch_options_come_straight_from_report_config() {
        let config = powerni_shared::ReportConfig {
            max_attempts: 7,
            ..Default::default()
        };
        let opts = FetchOptions::from(&config);
        assert_eq!(opts.timeout_secs, 10);
        assert_eq!(opts.max_attempts, 7);
        assert_eq!(opts.retry_backoff_ms, 500);
    }

    #[test]
    fn source_parse_distinguishes_urls_and_paths() {
        assert!(matches!(
            ReportSource::parse("https://example.com/report.json").unwrap(),
            ReportSource::Url(_)
        ));
        assert_eq!(
            ReportSource::parse(" public/report.json ").unwrap(),
            ReportSource::File(PathBuf::from("public/report.json"))
        );
        assert!(ReportSource::parse("   ").is_err());
        assert!(ReportSource::parse("http://").is_err());
    }

    #[tokio::test]
    async fn loads_fixture_from_file() {
        let source = ReportSource::File(fixture_path("json/report.monolithic.json"));
        let report = load_report(&source, &fast_retry(1)).await.expect("load");
        assert!(matches!(report.content, ReportContent::Monolithic(_)));
    }

    #[tokio::test]
    async fn missing_file_fails_after_all_attempts() {
        let source = ReportSource::File(fixture_path("json/does-not-exist.json"));
        let state = load_report_state(&source, &fast_retry(3)).await;
        match state {
            ReportState::Failed { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("does-not-exist.json"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_not_retried() {
        let tmp = std::env::temp_dir().join(format!("powerni_bad_{}.json", uuid::Uuid::now_v7()));
        std::fs::write(&tmp, "{\"subject\": ").unwrap();
        let state = load_report_state(&ReportSource::File(tmp), &fast_retry(5)).await;
        match state {
            ReportState::Failed { attempts, message } => {
                assert_eq!(attempts, 1);
                assert!(message.starts_with("malformed report document"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetches_report_over_http() {
        let server = wiremock::MockServer::start().await;
        let body = std::fs::read_to_string(fixture_path("json/report.split.json"))
            .expect("read split fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/report.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(&body))
            .mount(&server)
            .await;

        let source = ReportSource::parse(&format!("{}/report.json", server.uri())).unwrap();
        let report = load_report(&source, &fast_retry(1)).await.expect("fetch");
        assert!(matches!(report.content, ReportContent::Split(_)));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = wiremock::MockServer::start().await;
        let body = std::fs::read_to_string(fixture_path("json/report.split.json"))
            .expect("read split fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/report.json"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/report.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(&body))
            .mount(&server)
            .await;

        let source = ReportSource::parse(&format!("{}/report.json", server.uri())).unwrap();
        let state = load_report_state(&source, &fast_retry(3)).await;
        assert!(matches!(state, ReportState::Ready(_)));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/report.json"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let source = ReportSource::parse(&format!("{}/report.json", server.uri())).unwrap();
        let state = load_report_state(&source, &fast_retry(2)).await;
        match state {
            ReportState::Failed { attempts, message } => {
                assert_eq!(attempts, 2);
                assert!(message.contains("404"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
