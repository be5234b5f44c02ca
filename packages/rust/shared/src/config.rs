//! Application configuration for PowerNI.
//!
//! User config lives at `~/.powerni/powerni.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PowerniError, Result};
use crate::types::DEFAULT_COLLECTION;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "powerni.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".powerni";

// ---------------------------------------------------------------------------
// Config structs (matching powerni.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the report comes from and how hard to try fetching it.
    #[serde(default)]
    pub report: ReportConfig,

    /// Static page chrome.
    #[serde(default)]
    pub page: PageConfig,

    /// Subscription store settings.
    #[serde(default)]
    pub newsletter: NewsletterConfig,
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Local path or http(s) URL of the report JSON document.
    #[serde(default = "default_source")]
    pub source: String,

    /// Per-attempt timeout for remote fetches.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts before the report is declared unavailable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_source() -> String {
    "public/report.json".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

/// `[page]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_subtitle")]
    pub subtitle: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
        }
    }
}

fn default_title() -> String {
    "PowerNI Market Insights".into()
}
fn default_subtitle() -> String {
    "Energy Market Analysis".into()
}

/// `[newsletter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    /// libSQL database file holding the key-value store.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Key under which the subscription list is stored.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            collection: default_collection(),
        }
    }
}

fn default_db_path() -> String {
    "~/.powerni/newsletter.db".into()
}
fn default_collection() -> String {
    DEFAULT_COLLECTION.into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.powerni/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PowerniError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.powerni/powerni.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PowerniError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PowerniError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PowerniError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PowerniError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PowerniError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| PowerniError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("public/report.json"));
        assert!(toml_str.contains("newsletterEmails"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[report]
source = "https://example.com/report.json"
max_attempts = 5

[page]
title = "Grid Weekly"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.report.source, "https://example.com/report.json");
        assert_eq!(config.report.max_attempts, 5);
        assert_eq!(config.report.timeout_secs, 10);
        assert_eq!(config.page.title, "Grid Weekly");
        assert_eq!(config.page.subtitle, "Energy Market Analysis");
        assert_eq!(config.newsletter.collection, "newsletterEmails");
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let path = std::env::temp_dir().join("powerni_bad_config_test.toml");
        std::fs::write(&path, "[report\nsource = ").expect("write temp config");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home("var/newsletter.db").unwrap(),
            PathBuf::from("var/newsletter.db")
        );
        let expanded = expand_home("~/newsletter.db").unwrap();
        assert!(expanded.ends_with("newsletter.db"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
