//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use rosterlens_core::{Enricher, LeaguePage, NotificationSink, RunSummary, SkipReason};
use rosterlens_fetch::RosterFetcher;
use rosterlens_shared::{
    AppConfig, EnrichOptions, NetworkProfile, cache_db_path, init_config, load_config,
};
use rosterlens_storage::CacheStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// RosterLens — roster attributes for league stats pages.
#[derive(Parser)]
#[command(
    name = "rosterlens",
    version,
    about = "Add player position and grade columns to league stats pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Network profile selection on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ProfileArg {
    Desktop,
    Constrained,
}

impl From<ProfileArg> for NetworkProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Desktop => NetworkProfile::Desktop,
            ProfileArg::Constrained => NetworkProfile::Constrained,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch a stats page, enrich its tables, and write the result.
    Enhance {
        /// Stats page URL (must carry a subseason parameter).
        url: String,

        /// Output HTML file (defaults to enhanced.html).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Network profile override.
        #[arg(long)]
        profile: Option<ProfileArg>,

        /// Directory page ids to scan instead of the page's own team links.
        #[arg(long = "directory")]
        directories: Vec<String>,

        /// Bypass the roster cache entirely.
        #[arg(long)]
        no_cache: bool,
    },

    /// Roster cache management.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Remove every cached roster entry.
    Clear,
    /// Show cache location and entry count.
    Stats,
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
        0 => "rosterlens=info",
        1 => "rosterlens=debug",
        _ => "rosterlens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
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
    match cli.command {
        Command::Enhance {
            url,
            out,
            profile,
            directories,
            no_cache,
        } => cmd_enhance(&url, out, profile, directories, no_cache).await,
        Command::Cache { action } => match action {
            CacheAction::Clear => cmd_cache_clear().await,
            CacheAction::Stats => cmd_cache_stats().await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Enhance
// ---------------------------------------------------------------------------

async fn cmd_enhance(
    url: &str,
    out: Option<PathBuf>,
    profile: Option<ProfileArg>,
    directories: Vec<String>,
    no_cache: bool,
) -> Result<()> {
    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let host = parsed_url
        .host_str()
        .ok_or_else(|| eyre!("URL '{url}' has no host"))?;

    let mut config = load_config()?;
    if let Some(p) = profile {
        config.defaults.profile = p.into();
    }
    if !directories.is_empty() {
        config.discovery.directory_ids = directories;
    }

    let mut opts = EnrichOptions::from(&config);
    // Roster fetches go to the same site the stats page came from.
    opts.base_url = match parsed_url.port() {
        Some(port) => format!("{}://{host}:{port}", parsed_url.scheme()),
        None => format!("{}://{host}", parsed_url.scheme()),
    };
    opts.use_cache = !no_cache;

    let cache = if no_cache {
        None
    } else {
        let db_path = cache_db_path(&config)?;
        Some(CacheStore::open(&db_path).await?)
    };

    info!(url, profile = ?config.defaults.profile, "enhancing stats page");

    let reporter = CliProgress::new();
    // ProgressBar clones share state; keep a handle to clear it afterwards.
    let spinner = reporter.spinner.clone();

    let fetcher = Arc::new(RosterFetcher::new(&opts.base_url, opts.timeout)?);
    let html = fetcher.fetch_page(url).await?;
    let mut page = LeaguePage::parse(url, html);

    let mut enricher = Enricher::new(opts, cache, Box::new(reporter))?;
    let summary = enricher.run(&mut page).await;
    spinner.finish_and_clear();
    let summary = summary?;

    let report = match summary {
        RunSummary::Enriched(report) => report,
        RunSummary::Skipped(SkipReason::NoSeason) => {
            return Err(eyre!(
                "URL carries no subseason parameter, nothing to enrich"
            ));
        }
        RunSummary::Skipped(reason) => {
            return Err(eyre!("run skipped: {reason:?}"));
        }
    };

    let out_path = out.unwrap_or_else(|| PathBuf::from("enhanced.html"));
    std::fs::write(&out_path, page.render())
        .map_err(|e| eyre!("cannot write '{}': {e}", out_path.display()))?;

    println!();
    println!("  Stats page enhanced!");
    println!("  Season:   {}", report.season);
    println!("  Tables:   {}", report.tables_enhanced);
    println!(
        "  Players:  {} of {} rows matched",
        report.rows_matched, report.rows_total
    );
    println!(
        "  Rosters:  {} fetched, {} cached, {} failed",
        report.rosters_fetched, report.rosters_from_cache, report.rosters_failed
    );
    if report.used_stale_cache {
        println!("  Note:     live data unavailable, served from expired cache");
    }
    println!("  Output:   {}", out_path.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress sink
// ---------------------------------------------------------------------------

/// Notification sink backed by an indicatif spinner.
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
}

impl NotificationSink for CliProgress {
    fn progress(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn error(&self, message: &str) {
        self.spinner.println(format!("warning: {message}"));
    }
}

// ---------------------------------------------------------------------------
// Cache and config
// ---------------------------------------------------------------------------

async fn cmd_cache_clear() -> Result<()> {
    let config = load_config()?;
    let db_path = cache_db_path(&config)?;
    let store = CacheStore::open(&db_path).await?;
    store.clear().await?;
    println!("Cache cleared: {}", db_path.display());
    Ok(())
}

async fn cmd_cache_stats() -> Result<()> {
    let config = load_config()?;
    let db_path = cache_db_path(&config)?;
    let store = CacheStore::open(&db_path).await?;
    let count = store.entry_count().await?;
    println!("Cache:   {}", db_path.display());
    println!("Entries: {count}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
