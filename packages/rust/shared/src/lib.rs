//! Shared types, error model, and configuration for PowerNI.
//!
//! This crate is the foundation depended on by all other PowerNI crates.
//! It provides:
//! - [`PowerniError`]: the unified error type
//! - Domain types ([`Report`], [`ReportContent`], [`SubscriptionEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, NewsletterConfig, PageConfig, ReportConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{PowerniError, Result};
pub use types::{
    DEFAULT_COLLECTION, Report, ReportContent, SplitContent, SubscriptionEntry,
    parse_generated_at,
};
