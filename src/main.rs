//! Menu-Harvest main entry point
//!
//! This is the command-line interface for the Menu-Harvest scraping worker.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use menu_harvest::browser::{Browser, ChromeBrowser};
use menu_harvest::config::{load_config_with_hash, Config};
use menu_harvest::crawler::{Coordinator, CoordinatorSettings, WorkerPool, WorkerSettings};
use menu_harvest::extract::{build_http_client, default_pipeline};
use menu_harvest::job::{CrawlJob, PAGE_ADDED};
use menu_harvest::output::{inspect_html, load_statistics, print_inspection, print_statistics};
use menu_harvest::state::StateCache;
use menu_harvest::storage::{open_storage, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Menu-Harvest: a restaurant menu scraping worker
///
/// Menu-Harvest takes page jobs from a queue, renders each page in headless
/// Chrome, extracts menu text or menu files, and publishes the results.
#[derive(Parser, Debug)]
#[command(name = "menu-harvest")]
#[command(version)]
#[command(about = "A restaurant menu scraping worker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process jobs from the queue until Ctrl-C or SIGTERM
    Run,

    /// Publish a page job for a restaurant website
    Enqueue {
        /// Absolute http(s) URL of the page
        url: String,

        /// Backend job id (defaults to a random UUID)
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Run selector inference and link discovery over a saved HTML file
    Inspect {
        /// Path to the HTML file
        html: PathBuf,

        /// URL the page was saved from, used to resolve links
        #[arg(long, default_value = "https://localhost/")]
        url: String,
    },

    /// Show queue depths and cache entry counts
    Status,

    /// Drop the cached extraction strategy of a hostname
    Forget {
        /// Hostname, e.g. trattoria.example.com
        hostname: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Run => handle_run(config).await,
        Command::Enqueue { url, job_id } => handle_enqueue(&config, &url, job_id).await,
        Command::Inspect { html, url } => handle_inspect(&html, &url),
        Command::Status => handle_status(&config).await,
        Command::Forget { hostname } => handle_forget(&config, &hostname).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("menu_harvest=info,warn"),
            1 => EnvFilter::new("menu_harvest=debug,info"),
            2 => EnvFilter::new("menu_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let path = Path::new(&config.storage.database_path);
    let store = open_storage(path).with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Handles `run`: starts the worker pool and stops it on Ctrl-C or SIGTERM
async fn handle_run(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    match store.purge_expired() {
        Ok(0) => {}
        Ok(purged) => tracing::info!("Purged {} expired cache entries", purged),
        Err(e) => tracing::warn!("Failed to purge expired cache entries: {}", e),
    }

    let client = build_http_client(config.browser.navigation_timeout()).context("failed to build HTTP client")?;
    let extractors = default_pipeline(
        client,
        PathBuf::from(&config.storage.upload_root),
        config.browser.render_timeout(),
    );

    let browser = Arc::new(ChromeBrowser::new(config.browser.clone()));
    let state = StateCache::new(store.clone(), config.storage.cache_ttl());
    let coordinator = Coordinator::new(
        browser.clone(),
        state,
        store.clone(),
        extractors,
        CoordinatorSettings::from_config(&config),
    );
    let pool = WorkerPool::new(Arc::new(coordinator), store, WorkerSettings::from_config(&config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                tracing::info!("{} received, finishing in-flight jobs", signal);
                let _ = shutdown_tx.send(true);
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signals: {}", e),
        }
    });

    let summary = pool.run(shutdown_rx).await;
    browser.shutdown().await;

    println!(
        "Processed {} jobs ({} failed, {} invalid, {} left for redelivery)",
        summary.completed + summary.failed,
        summary.failed,
        summary.invalid,
        summary.redelivered
    );
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "Interrupt"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Interrupt")
}

/// Handles `enqueue`: publishes a root page job
async fn handle_enqueue(config: &Config, url: &str, job_id: Option<String>) -> Result<()> {
    use menu_harvest::storage::MessageQueue;

    let job_id = job_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let job = CrawlJob::page(job_id, url);
    job.validate()?;

    let store = open_store(config)?;
    let payload = serde_json::to_string(&job)?;
    let id = store
        .publish(&config.queues.jobs, PAGE_ADDED, &payload)
        .await
        .context("failed to publish job")?;

    println!("Queued job {} for {} (message {})", job.job_id, job.url, id);
    Ok(())
}

/// Handles `inspect`: reports what the extractors see in a saved page
fn handle_inspect(html: &Path, url: &str) -> Result<()> {
    let content = std::fs::read_to_string(html).with_context(|| format!("failed to read {}", html.display()))?;
    let page_url = Url::parse(url).with_context(|| format!("invalid page URL {}", url))?;

    let report = inspect_html(&content, &page_url);
    print_inspection(&report);
    Ok(())
}

/// Handles `status`: shows queue depths and cache counts
async fn handle_status(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_store(config)?;
    let stats = load_statistics(store.as_ref(), store.as_ref(), &config.queues).await?;
    print_statistics(&stats);
    Ok(())
}

/// Handles `forget`: drops a hostname's cached strategy
async fn handle_forget(config: &Config, hostname: &str) -> Result<()> {
    let store = open_store(config)?;
    let state = StateCache::new(store, config.storage.cache_ttl());
    let hostname = hostname.trim().to_lowercase();

    if state.forget_strategy(&hostname).await? {
        println!("Dropped cached strategy for {}", hostname);
    } else {
        println!("No cached strategy for {}", hostname);
    }
    Ok(())
}
