//! CLI entry point for the mapshot scraper.

use anyhow::{Context, Result};
use clap::Parser;
use mapshot_core::{DownloadManager, GalleryNavigator};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = args.into_config();
    info!(
        location = %config.location,
        headless = config.headless,
        csv = config.csv_enabled,
        download = config.download_enabled,
        max_images = config.max_images,
        max_workers = config.max_workers,
        "mapshot starting"
    );

    // The manager creates the per-location directory and (if enabled) the
    // ledger up front, so a run that discovers nothing still leaves a trace.
    let manager = DownloadManager::new(config.clone())
        .context("failed to initialize download manager")?;
    if let Some(path) = manager.ledger_path() {
        info!(path = %path.display(), "recording discovered URLs");
    }

    // Navigation errors are fatal: without a gallery there is nothing to do.
    // Individual download failures never affect the exit code.
    let navigator = GalleryNavigator::new(config.clone());
    let discovered = navigator.run(&manager).await.with_context(|| {
        format!(
            "failed to scrape photo gallery for '{}'",
            config.location
        )
    })?;

    info!(discovered, "gallery discovery complete, waiting for downloads");
    let stats = manager.finish().await;

    info!(
        discovered = stats.discovered(),
        downloaded = stats.completed(),
        failed = stats.failed(),
        output_dir = %config.location_dir().display(),
        "scrape complete"
    );

    Ok(())
}
