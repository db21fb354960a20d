//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use mapshot_core::{
    DEFAULT_DOWNLOAD_DIR, DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT_SECS, RunConfig,
};

/// Scrape a location's photo gallery from Google Maps.
///
/// Mapshot searches Google Maps for a location, walks its photo gallery,
/// records every discovered image URL to a CSV ledger in real time, and
/// downloads the images with a bounded worker pool.
#[derive(Parser, Debug)]
#[command(name = "mapshot")]
#[command(author, version, about)]
pub struct Args {
    /// Location name to search for
    pub location: String,

    /// Run the browser in headless mode
    #[arg(long)]
    pub headless: bool,

    /// Directory to save the ledger and downloaded images
    #[arg(long, default_value = DEFAULT_DOWNLOAD_DIR)]
    pub download_dir: PathBuf,

    /// Maximum number of images to record (unlimited when omitted)
    #[arg(long)]
    pub max_images: Option<u64>,

    /// Maximum number of concurrent download workers (1-100)
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub max_workers: u8,

    /// Timeout in seconds for browser waits and image fetches (1-600)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Disable writing discovered URLs to the CSV ledger
    #[arg(long)]
    pub no_csv: bool,

    /// Only record URLs to the CSV ledger, never download images
    #[arg(long)]
    pub only_csv: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Resolves the arguments into the immutable run configuration.
    ///
    /// `--only-csv` wins over everything else for the download switch.
    pub fn into_config(self) -> Arc<RunConfig> {
        Arc::new(RunConfig {
            location: self.location,
            headless: self.headless,
            download_dir: self.download_dir,
            max_images: self.max_images,
            max_workers: usize::from(self.max_workers),
            timeout: Duration::from_secs(self.timeout),
            csv_enabled: !self.no_csv,
            download_enabled: !self.only_csv,
        })
    }
}
