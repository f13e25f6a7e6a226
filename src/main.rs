//! Doc-Harvest main entry point
//!
//! This is the command-line interface for the Doc-Harvest scrape-and-index job.

use anyhow::{bail, Context};
use clap::Parser;
use doc_harvest::backend::{GeminiBackend, IndexingBackend};
use doc_harvest::config::{check_source, load_config_with_hash, Config};
use doc_harvest::download::{build_http_client, Downloader};
use doc_harvest::extract::HtmlLinkExtractor;
use doc_harvest::output::{
    load_schedule_status, print_query_answer, print_run_summary, print_schedule_status,
    print_upload_report,
};
use doc_harvest::prompt::PromptLibrary;
use doc_harvest::storage::open_schedule_store;
use doc_harvest::upload::{collect_dir, upload_files};
use doc_harvest::{FileValidator, IndexScheduler, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Doc-Harvest: scrape public documents and index them for retrieval
///
/// Doc-Harvest collects document links from configured sources, downloads
/// new files, filters them, and indexes them into hosted retrieval stores
/// when enough files accumulate or a store has gone stale.
#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(version)]
#[command(about = "Scrape public documents and index them for retrieval", long_about = None)]
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

    /// Validate config and show what would be scraped without doing it
    #[arg(long, conflicts_with_all = ["status", "create_store", "upload_dir", "query"])]
    dry_run: bool,

    /// Show when each store was last indexed and exit
    #[arg(long, conflicts_with_all = ["dry_run", "create_store", "upload_dir", "query"])]
    status: bool,

    /// Create a retrieval store with this display name and print its id
    #[arg(long, value_name = "NAME", conflicts_with_all = ["dry_run", "status", "upload_dir", "query"])]
    create_store: Option<String>,

    /// Validate and upload every file in a directory (requires --store)
    #[arg(long, value_name = "DIR", requires = "store", conflicts_with_all = ["dry_run", "status", "create_store", "query"])]
    upload_dir: Option<PathBuf>,

    /// Ask a grounded question against a store (requires --store)
    #[arg(long, value_name = "TEXT", requires = "store", conflicts_with_all = ["dry_run", "status", "create_store", "upload_dir"])]
    query: Option<String>,

    /// Target store id for --upload-dir and --query
    #[arg(long, value_name = "ID")]
    store: Option<String>,

    /// Prompt profile for --query
    #[arg(long, value_name = "PROFILE", default_value = "default")]
    profile: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Could not load .env file: {}", e);
        }
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.status {
        handle_status(&config).await?;
    } else if let Some(name) = &cli.create_store {
        handle_create_store(&config, name).await?;
    } else if let Some(dir) = &cli.upload_dir {
        let store = cli.store.as_deref().context("--upload-dir requires --store")?;
        handle_upload(&config, dir, store).await?;
    } else if let Some(text) = &cli.query {
        let store = cli.store.as_deref().context("--query requires --store")?;
        let base_dir = cli.config.parent().unwrap_or_else(|| Path::new("."));
        handle_query(&config, base_dir, store, text, &cli.profile).await?;
    } else {
        handle_run(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvest=info,warn"),
            1 => EnvFilter::new("doc_harvest=debug,info"),
            2 => EnvFilter::new("doc_harvest=trace,debug"),
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

fn backend(config: &Config) -> anyhow::Result<GeminiBackend> {
    let client = build_http_client(&config.download)?;
    Ok(GeminiBackend::from_env(client, &config.backend)?)
}

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config) {
    println!("=== Doc-Harvest Dry Run ===\n");

    println!("Scheduling:");
    println!("  Min files to index: {}", config.scraper.min_files_to_index);
    println!("  Max wait: {} days", config.scraper.max_wait_days);
    println!(
        "  Concurrent sources: {}",
        config.scraper.max_concurrent_sources
    );

    println!("\nDownloads:");
    println!("  Data root: {}", config.download.data_root.display());
    println!("  Extensions: {}", config.download.extensions.join(", "));
    println!("  Max file size: {} MB", config.filter.max_file_size_mb);

    println!("\nState: {:?} at {}", config.state.backend, config.state.path.display());

    println!("\nSources ({}):", config.sources.len());
    let mut usable = 0;
    for source in &config.sources {
        let store = source.resolve_store();
        let problem = check_source(source).err().map(|e| e.to_string());
        match (&store, &problem) {
            (Ok(store), None) => {
                usable += 1;
                println!(
                    "  - {} [{}] {} -> {} ({})",
                    source.id, source.category, source.kind, store, source.base_url
                );
            }
            (Err(e), _) => println!("  - {} SKIPPED: {}", source.id, e),
            (_, Some(problem)) => println!("  - {} SKIPPED: {}", source.id, problem),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would scrape {} of {} sources", usable, config.sources.len());
}

/// Handles the --status mode: shows the indexing schedule
async fn handle_status(config: &Config) -> anyhow::Result<()> {
    let schedule = open_schedule_store(&config.state)?;
    let downloader = Downloader::from_config(build_http_client(&config.download)?, &config.download);

    let statuses = load_schedule_status(&config.sources, schedule.as_ref(), &downloader).await?;
    print_schedule_status(&statuses);
    Ok(())
}

async fn handle_create_store(config: &Config, name: &str) -> anyhow::Result<()> {
    let store = backend(config)?.create_store(name).await?;
    println!("{}", store);
    Ok(())
}

async fn handle_upload(config: &Config, dir: &Path, store: &str) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let paths = collect_dir(dir).with_context(|| format!("Cannot list {}", dir.display()))?;
    if paths.is_empty() {
        bail!("No files found in {}", dir.display());
    }

    tracing::info!(store, "Uploading {} files from {}", paths.len(), dir.display());
    let validator = FileValidator::from_config(&config.filter);
    let report = upload_files(&backend(config)?, &validator, store, &paths).await?;
    print_upload_report(&report);
    Ok(())
}

async fn handle_query(
    config: &Config,
    base_dir: &Path,
    store: &str,
    text: &str,
    profile: &str,
) -> anyhow::Result<()> {
    let prompts = PromptLibrary::new(&config.prompts, base_dir);
    let instruction = prompts.system_instruction(profile)?;

    let answer = backend(config)?
        .query(store, text, &instruction.text)
        .await?;
    print_query_answer(&answer);
    Ok(())
}

/// Handles the main scrape-and-index run
async fn handle_run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Sources: {}", config.sources.len());

    let client = build_http_client(&config.download)?;
    let schedule = open_schedule_store(&config.state)?;
    let backend = GeminiBackend::from_env(client.clone(), &config.backend)?;

    let orchestrator = Orchestrator::new(
        Arc::new(HtmlLinkExtractor::with_defaults(client.clone())),
        Downloader::from_config(client, &config.download),
        FileValidator::from_config(&config.filter),
        IndexScheduler::from_config(schedule, &config.scraper),
        Arc::new(backend),
    )
    .with_concurrency(config.scraper.max_concurrent_sources);

    let summary = orchestrator
        .run(&config.sources)
        .await
        .context("Scrape run aborted")?;

    print_run_summary(&summary);

    if summary.has_failures() {
        tracing::warn!("Run finished with failures");
    } else {
        tracing::info!("Run completed successfully");
    }

    Ok(())
}
