//! Groupsync CLI Binary
//!
//! Entry point for the agent-group to asset-tag sync job. Intended to run
//! unattended from a scheduler; a stable inventory produces zero mutations.

use anyhow::Context;
use clap::Parser;
use groupsync::cache::{load_or_refresh_agents, load_or_refresh_assets, SnapshotCache};
use groupsync::cli::{map_error, Cli};
use groupsync::config::{ConfigLoader, SyncConfig};
use groupsync::logging::{init_logging, LoggingConfig};
use groupsync::platform::IoClient;
use groupsync::reconcile::{Reconciler, RunSummary};
use std::process;
use std::time::Duration;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Starting groupsync");

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        eprintln!("{}", map_error(&e));
        process::exit(1);
    }

    // One writer, no concurrent readers: a current-thread runtime is all the
    // sequential asset loop needs.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(&cli, &config)) {
        Ok(summary) => {
            info!(
                reconciled = summary.reconciled,
                unchanged = summary.unchanged,
                skipped = summary.skipped,
                failed_calls = summary.failed_calls,
                "done"
            );
        }
        Err(e) => {
            error!("Sync failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: &Cli, config: &SyncConfig) -> anyhow::Result<RunSummary> {
    let client = IoClient::new(
        config.base_url.clone(),
        &config.access_key,
        &config.secret_key,
    )
    .context("failed to build platform client")?;

    let cache = SnapshotCache::new(config.cache.dir.clone(), config.cache.ttl_secs);
    let agents = load_or_refresh_agents(&client, &cache, cli.refresh).await;
    let assets = load_or_refresh_assets(&client, &cache, cli.refresh).await;
    info!(agents = agents.len(), assets = assets.len(), "Inventory loaded");

    let mut reconciler = Reconciler::new(
        &client,
        &config.category,
        Duration::from_millis(config.create_delay_ms),
        cli.dry_run,
    )
    .await
    .context("failed to prepare tag universe")?;

    let summary = reconciler
        .run(&agents, &assets)
        .await
        .context("reconciliation pass failed")?;
    Ok(summary)
}

/// Logging configuration precedence: CLI flags override the config file
/// override defaults.
fn build_logging_config(cli: &Cli, config: &SyncConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();

    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        logging.file = file.clone();
    }

    logging
}
