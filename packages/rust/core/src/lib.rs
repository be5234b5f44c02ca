//! Core pipeline orchestration and domain logic for PowerNI.
//!
//! This crate ties together report loading, rendering, page assembly and the
//! newsletter subscription store into end-to-end workflows (e.g., `render_site`).

pub mod ingest;
pub mod loader;
pub mod page;
pub mod pipeline;
pub mod subscription;

pub use ingest::{generate_report_files, report_from_text, write_report};
pub use loader::{FetchOptions, ReportSource, ReportState, load_report, load_report_state};
pub use page::{PageOptions, assemble_page, write_page};
pub use pipeline::{
    ProgressReporter, RenderConfig, RenderResult, SilentProgress, open_subscriptions,
    read_subscriptions, render_site, report_outline, subscriber_count,
};
pub use subscription::{
    SUCCESS_MESSAGE, SubscriptionError, SubscriptionStore, check_submission, is_valid_email,
};
