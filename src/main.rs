//! Olympedia-Harvest main entry point
//!
//! This is the command-line interface for the staged results-site crawler.

use anyhow::Context;
use clap::Parser;
use olympedia_harvest::config::{load_config_with_hash, Config};
use olympedia_harvest::pipeline::{Pipeline, Stage, StagePlan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Olympedia-Harvest: a proxied, resumable results-site crawler
///
/// Discovers country, event and athlete pages, scrapes athlete records,
/// host cities and national committees, and writes them as CSV and JSON.
/// Stages whose output already exists are skipped, so an interrupted run
/// resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "olympedia-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A proxied, resumable results-site crawler", long_about = None)]
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

    /// Remove all stage artifacts and crawl everything again
    #[arg(long, conflicts_with = "dry_run")]
    fresh: bool,

    /// Validate config and show which stages would run, without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Run a single stage instead of the whole pipeline
    #[arg(long, value_enum, value_name = "STAGE")]
    only: Option<Stage>,

    /// Directory the artifact paths are relative to
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let stages: Vec<Stage> = match cli.only {
        Some(stage) => vec![stage],
        None => Stage::ALL.to_vec(),
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli.root, &stages);
        return Ok(ExitCode::SUCCESS);
    }

    handle_run(&config, &cli.root, &stages, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("olympedia_harvest=info,warn"),
            1 => EnvFilter::new("olympedia_harvest=debug,info"),
            2 => EnvFilter::new("olympedia_harvest=trace,debug"),
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

/// Handles the --dry-run mode: prints configuration and the stage plan
fn handle_dry_run(config: &Config, root: &Path, stages: &[Stage]) {
    println!("=== Olympedia-Harvest Dry Run ===\n");

    println!("Site: {}", config.site.base_url);

    println!("\nWorkers:");
    println!("  Countries: {}", config.crawler.country_workers);
    println!("  Events: {}", config.crawler.event_workers);
    println!("  Athletes: {}", config.crawler.athlete_workers);
    println!("  Scrape: {}", config.crawler.scrape_workers);

    println!("\nFetcher:");
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Backoff: {}s x {} (max {}s)",
        config.fetcher.retry_delay_secs, config.fetcher.backoff_factor, config.fetcher.max_wait_secs
    );
    println!("  Request timeout: {}s", config.fetcher.request_timeout_secs);

    println!("\nProxies:");
    println!("  Source: {}", config.proxy.source);
    println!("  Probe: {}", config.proxy.probe_url);

    println!("\nStages (artifacts under {}):", root.display());
    let pipeline = Pipeline::from_config(config, root);
    for (stage, plan) in pipeline.plan(stages) {
        match plan {
            StagePlan::Run => println!("  - {}: run", stage),
            StagePlan::Skip(key) => println!("  - {}: skip ({} exists)", stage, key),
            StagePlan::Blocked(key) => println!("  - {}: blocked ({} missing)", stage, key),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main pipeline run
async fn handle_run(config: &Config, root: &Path, stages: &[Stage], fresh: bool) -> anyhow::Result<ExitCode> {
    let pipeline = Pipeline::from_config(config, root);

    if fresh {
        tracing::info!("Starting fresh run (removing previous artifacts)");
        pipeline
            .clear_artifacts()
            .context("Failed to remove previous artifacts")?;
    }

    let report = pipeline.run_stages(stages).await;
    tracing::info!(
        "Stages run: {}, skipped: {}, missing input: {}",
        report.ran.len(),
        report.skipped.len(),
        report.missing_input.len()
    );
    println!("{}", pipeline.status().get());

    if report.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
