//! Run configuration resolved once at startup.
//!
//! A [`RunConfig`] is built from CLI arguments before any browser or network
//! activity starts and is never mutated afterwards. All derived paths (the
//! per-location directory, image file paths) are computed from it so every
//! component agrees on where a run's artifacts live.

use std::path::PathBuf;
use std::time::Duration;

use crate::download::filename::{image_filename, sanitize_component};

/// Default directory for downloaded images and the CSV ledger.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloaded_images";

/// Default number of concurrent download workers.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Default timeout in seconds for browser waits and image fetches.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable options for a single scraping run.
///
/// Resolved once at startup; `download_enabled` is already reconciled with
/// the `--only-csv` flag by the time a `RunConfig` exists, so components
/// never need to re-derive mode interactions.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Location name to search for on Google Maps.
    pub location: String,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Root directory for per-location artifacts.
    pub download_dir: PathBuf,
    /// Cap on discovered images; `None` means unlimited.
    pub max_images: Option<u64>,
    /// Number of concurrent download workers.
    pub max_workers: usize,
    /// Timeout for browser waits and image fetches.
    pub timeout: Duration,
    /// Whether discovered URLs are appended to the CSV ledger.
    pub csv_enabled: bool,
    /// Whether discovered images are downloaded.
    pub download_enabled: bool,
}

impl RunConfig {
    /// Returns the location name sanitized for use in file and directory names.
    #[must_use]
    pub fn sanitized_location(&self) -> String {
        sanitize_component(&self.location)
    }

    /// Returns the per-location directory holding the ledger and images.
    #[must_use]
    pub fn location_dir(&self) -> PathBuf {
        self.download_dir.join(self.sanitized_location())
    }

    /// Returns the target path for a discovered image.
    ///
    /// Paths are distinct per sequence index, so concurrent workers never
    /// write to the same file.
    #[must_use]
    pub fn image_path(&self, sequence_index: u64, url: &str) -> PathBuf {
        self.location_dir()
            .join(image_filename(&self.location, sequence_index, url))
    }
}
