//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use powerni_core::{
    FetchOptions, ProgressReporter, RenderConfig, RenderResult, ReportSource, ReportState,
    SUCCESS_MESSAGE, SubscriptionError, generate_report_files, load_report, open_subscriptions,
    read_subscriptions, render_site, report_outline,
};
use powerni_render::format_entry_timestamp;
use powerni_shared::{AppConfig, expand_home, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PowerNI: weekly energy market insights for Northern Ireland.
#[derive(Parser)]
#[command(
    name = "powerni",
    version,
    about = "Render the PowerNI market report and manage newsletter subscriptions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render the report into an HTML page.
    Render {
        /// Report JSON path or http(s) URL (defaults to `[report] source`).
        #[arg(long)]
        report: Option<String>,

        /// Output HTML file.
        #[arg(short, long, default_value = "public/index.html")]
        out: PathBuf,

        /// Print the rendered fragments as JSON instead of writing a page.
        #[arg(long)]
        json: bool,
    },

    /// Convert a plain-text report into report JSON.
    Generate {
        /// Plain-text report.
        #[arg(short, long, default_value = "reports/latest.txt")]
        input: PathBuf,

        /// Output JSON file (can be specified multiple times).
        #[arg(short, long, default_value = "public/report.json")]
        out: Vec<PathBuf>,
    },

    /// Subscribe an email address to the newsletter.
    Subscribe {
        /// Email address.
        email: String,
    },

    /// List subscribed email addresses.
    Subscribers,

    /// Print the section titles of a report.
    Outline {
        /// Report JSON path or http(s) URL (defaults to `[report] source`).
        #[arg(long)]
        report: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "powerni=info",
        1 => "powerni=debug",
        _ => "powerni=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render { report, out, json } => cmd_render(report.as_deref(), &out, json).await,
        Command::Generate { input, out } => cmd_generate(&input, &out),
        Command::Subscribe { email } => cmd_subscribe(&email).await,
        Command::Subscribers => cmd_subscribers().await,
        Command::Outline { report } => cmd_outline(report.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_render(report: Option<&str>, out: &Path, json: bool) -> Result<()> {
    let config = load_config()?;
    let mut render_config = RenderConfig::from_app_config(&config)?;
    if let Some(raw) = report {
        render_config.source = ReportSource::parse(raw)?;
    }
    if !json {
        render_config.out = Some(out.to_path_buf());
    }

    info!(source = %render_config.source, "rendering report");

    let progress: Box<dyn ProgressReporter> = if json {
        Box::new(powerni_core::SilentProgress)
    } else {
        Box::new(CliProgress::new())
    };
    let result = render_site(&render_config, progress.as_ref()).await?;

    if let ReportState::Failed { message, attempts } = &result.state {
        if let Some(path) = &result.written_to {
            eprintln!("  Error page written to {}", path.display());
        }
        return Err(eyre!(
            "report unavailable after {attempts} attempt(s): {message}"
        ));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result.rendered)?);
        return Ok(());
    }

    print_render_summary(&result);
    Ok(())
}

fn print_render_summary(result: &RenderResult) {
    let subscribers = result
        .subscriber_count
        .map_or_else(|| "unavailable".to_string(), |n| n.to_string());

    println!();
    println!("  Report rendered successfully!");
    if let Some(rendered) = &result.rendered {
        println!("  Generated:   {}", rendered.generated_at);
        println!("  Sources:     {}", rendered.sources.len());
    }
    println!("  Subscribers: {subscribers}");
    if let Some(path) = &result.written_to {
        println!("  Page:        {}", path.display());
    }
    println!(
        "  Time:        {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();
}

fn cmd_generate(input: &Path, outputs: &[PathBuf]) -> Result<()> {
    let generated_at = chrono::Local::now().naive_local();
    let report = generate_report_files(input, outputs, generated_at)?;

    println!("Report generated: {}", report.subject);
    for out in outputs {
        println!("  {}", out.display());
    }
    Ok(())
}

async fn cmd_subscribe(email: &str) -> Result<()> {
    let config = load_config()?;
    let db_path = expand_home(&config.newsletter.db_path)?;

    let outcome = match open_subscriptions(&db_path, &config.newsletter.collection).await {
        Ok(subs) => subs.submit(email).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(entries) => {
            println!("{SUCCESS_MESSAGE}");
            info!(count = entries.len(), "subscription list updated");
            Ok(())
        }
        Err(e) => {
            if let SubscriptionError::Persistence(detail) = &e {
                error!(path = %db_path.display(), detail, "subscription store failed");
            }
            Err(eyre!(e.user_message()))
        }
    }
}

async fn cmd_subscribers() -> Result<()> {
    let config = load_config()?;
    let db_path = expand_home(&config.newsletter.db_path)?;
    let entries = read_subscriptions(&db_path, &config.newsletter.collection).await?;

    if entries.is_empty() {
        println!("No subscribers yet.");
        return Ok(());
    }

    println!("Subscribed Emails ({})", entries.len());
    for entry in &entries {
        println!(
            "  {} - {}",
            entry.email,
            format_entry_timestamp(&entry.timestamp)
        );
    }
    Ok(())
}

async fn cmd_outline(report: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let source = ReportSource::parse(report.unwrap_or(&config.report.source))?;

    let report = load_report(&source, &FetchOptions::from(&config.report)).await?;
    println!("{}", report.subject);
    for section in report_outline(&report) {
        let lines = section.body.lines().filter(|l| !l.trim().is_empty()).count();
        println!("  {} ({lines} lines)", section.title);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &RenderResult) {
        self.spinner.finish_and_clear();
    }
}
