//! Arkive worker: one orchestrator process driving one feeder run.
//!
//! Run several workers (each with its own config and feeder slice) for
//! parallelism across items; a single worker processes one item at a time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arkive_core::{
    builtin_factories, load_config, validate_config, ModuleRegistry, Orchestrator,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Fatal setup failures (missing binary dependencies, failed module
        // setup, bad config) land here before any item is processed.
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("arkive worker {VERSION} starting");

    // Determine config path
    let config_path = std::env::var("ARKIVE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;
    validate_config(&config).context("Configuration validation failed")?;

    // Discover modules and assemble the pipeline
    let mut registry = ModuleRegistry::with_factories(builtin_factories());
    let discovered = registry.discover(&config.modules.paths);
    info!(discovered, "module discovery finished");

    let (orchestrator, feeder) = Orchestrator::assemble(&config, &mut registry)
        .await
        .context("Failed to assemble pipeline")?;

    // Stop cleanly on ctrl-c: the current item is abandoned at its next
    // stage boundary and no further items are pulled.
    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.request_stop();
        }
    });

    let summary = orchestrator.run(feeder).await;
    info!(
        processed = summary.processed,
        done = summary.done,
        cached = summary.cached,
        failed = summary.failed,
        aborted = summary.aborted,
        "worker finished"
    );

    Ok(())
}
