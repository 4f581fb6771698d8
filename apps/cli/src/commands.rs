//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use istawatch_core::{CycleObserver, CycleReport, run_update_cycle, run_watch_loop};
use istawatch_session::ChromiumSession;
use istawatch_shared::{
    AppConfig, Application, CategorizedDownload, SessionState, TransferSettings, UpdateRecord,
    WatchError, config_file_path, init_config, load_config, load_config_from,
    validate_credentials,
};
use istawatch_store::MetadataStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// istawatch — keep workshop-system artifacts current.
#[derive(Parser)]
#[command(
    name = "istawatch",
    version,
    about = "Watch an authenticated service portal for new artifact releases and download them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.istawatch/istawatch.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Run a single update cycle and exit.
    Run,

    /// Run update cycles on the configured interval until interrupted.
    Watch,

    /// Show the recorded state of every (application, category) pair.
    Status,

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
        0 => "istawatch=info",
        1 => "istawatch=debug",
        _ => "istawatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run => cmd_run(&config).await,
        Command::Watch => cmd_watch(&config).await,
        Command::Status => cmd_status(&config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    validate_credentials(config)?;

    let settings = TransferSettings::from(config);
    let mut store = MetadataStore::load(&settings.root)?;

    info!(portal = %config.portal.base_url, "starting single update cycle");

    let session = ChromiumSession::launch(&config.browser).await?;
    let mut state = SessionState::default();
    let reporter = CliProgress::new();

    let report = run_update_cycle(&session, config, &mut store, &mut state, &reporter).await;
    reporter.finish();

    print_report(&report);
    Ok(())
}

async fn cmd_watch(config: &AppConfig) -> Result<()> {
    validate_credentials(config)?;

    let settings = TransferSettings::from(config);
    let mut store = MetadataStore::load(&settings.root)?;

    info!(
        portal = %config.portal.base_url,
        interval_minutes = config.schedule.interval_minutes,
        "starting watch loop"
    );

    let reporter = CliProgress::new();
    run_watch_loop(
        || ChromiumSession::launch(&config.browser),
        config,
        &mut store,
        &reporter,
    )
    .await?;

    Ok(())
}

fn cmd_status(config: &AppConfig) -> Result<()> {
    let settings = TransferSettings::from(config);
    let store = MetadataStore::load(&settings.root)?;

    if store.is_empty() {
        println!("No artifacts recorded yet. Run `istawatch run` first.");
        return Ok(());
    }

    println!();
    println!("  {:<26} {:<14} {:>12}  {}", "key", "version", "size", "downloaded at");
    for (key, record) in store.iter() {
        println!(
            "  {:<26} {:<14} {:>12}  {}",
            key,
            record.version,
            format_size(record.file_size_bytes),
            record.downloaded_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created at {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let path = config_file_path()?;
    println!("# resolved configuration ({})", path.display());
    println!("{}", toml::to_string_pretty(config).map_err(|e| color_eyre::eyre::eyre!(e))?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_report(report: &CycleReport) {
    println!();
    if !report.authenticated {
        println!("  Cycle aborted: portal authentication failed.");
        println!();
        return;
    }
    println!("  Update cycle complete.");
    println!("  Downloaded: {}", report.success_count);
    println!("  Failed:     {}", report.fail_count);
    println!();
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Cycle observer rendering an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CycleObserver for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn application(&self, application: Application) {
        self.spinner
            .set_message(format!("Checking {application}"));
    }

    fn download_started(&self, download: &CategorizedDownload) {
        self.spinner.set_message(format!(
            "Downloading {} {} ({})",
            download.application, download.display_name, download.version
        ));
    }

    fn download_succeeded(&self, record: &UpdateRecord) {
        self.spinner.println(format!(
            "  ✓ {} {} ({})",
            record.file_name,
            record.version,
            format_size(record.file_size_bytes)
        ));
    }

    fn download_failed(&self, download: &CategorizedDownload, error: &WatchError) {
        self.spinner.println(format!(
            "  ✗ {} {}: {error}",
            download.application, download.display_name
        ));
    }

    fn done(&self, _report: &CycleReport) {
        self.spinner.set_message("Cycle complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(6_442_450_944), "6.0 GB");
    }
}
