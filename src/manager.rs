//! Download and record management for discovered gallery images.
//!
//! This module provides the [`DownloadManager`], which turns the navigator's
//! stream of discovered URLs into (a) a durable CSV record and (b) downloaded
//! image files, using a semaphore-bounded worker pool.
//!
//! # Concurrency Model
//!
//! - `record` runs on the navigator's control path and is serialized by a
//!   mutex; the ledger row is appended and flushed while the index lock is
//!   held, so rows land in sequence order even with concurrent callers.
//! - Each download runs in its own Tokio task holding a semaphore permit
//!   (RAII). `maybe_download` awaits a permit before spawning, so the caller
//!   blocks once all `max_workers` permits are taken - this back-pressure
//!   bounds memory use when discovery outpaces downloading.
//! - The ledger lock is never held across network I/O.
//!
//! # Failure Behavior
//!
//! Failed fetches are logged with URL and index context and dropped; there
//! are no retries. A failed fetch never leaves a file at the target path
//! because bodies are fully buffered before the write.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RunConfig;
use crate::download::HttpClient;
use crate::ledger::{CsvLedger, DiscoveredImage, LedgerError};

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 100;

/// Error type for manager construction and operation.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The per-location directory could not be created.
    #[error("failed to create download directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: std::path::PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be created.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Outcome of offering a URL to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// The URL was accepted; keep producing.
    Accepted,
    /// The image cap is reached; stop producing URLs.
    CapReached,
}

/// Receives image URLs in discovery order.
///
/// The navigator hands every newly surfaced URL to a sink and stops
/// producing once the sink reports [`SinkStatus::CapReached`].
#[async_trait]
pub trait UrlSink: Send + Sync {
    /// Offers one discovered URL to the sink.
    async fn accept(&self, url: &str) -> SinkStatus;
}

/// Statistics from a scraping run.
///
/// Tracks discovered, downloaded, and failed counts. Uses atomic counters
/// for thread-safe updates from concurrent download tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    discovered: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of accepted discoveries.
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::SeqCst)
    }

    /// Returns the number of successfully downloaded images.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of failed downloads.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Increments the discovered counter.
    fn increment_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the completed counter.
    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the failed counter.
    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Turns discovered URLs into a durable CSV record and downloaded files.
///
/// The manager owns the run's ledger (when CSV logging is enabled), the HTTP
/// client, and the worker pool. It enforces the image cap by discarding
/// records beyond `max_images` - the navigator is additionally told to stop
/// via [`SinkStatus::CapReached`], but excess URLs arriving anyway are never
/// logged or downloaded.
#[derive(Debug)]
pub struct DownloadManager {
    config: Arc<RunConfig>,
    ledger: Option<CsvLedger>,
    client: HttpClient,
    /// Semaphore for worker concurrency control.
    semaphore: Arc<Semaphore>,
    /// Next sequence index; held across the ledger append so rows stay in
    /// index order.
    next_index: Mutex<u64>,
    stats: Arc<DownloadStats>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DownloadManager {
    /// Creates a manager for one run, creating the per-location directory
    /// and (when enabled) the CSV ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidWorkerCount`] if `max_workers` is
    /// outside 1-100, [`ManagerError::CreateDir`] if the location directory
    /// cannot be created, or [`ManagerError::Ledger`] if the ledger file
    /// cannot be created.
    #[instrument(skip(config), fields(location = %config.location))]
    pub fn new(config: Arc<RunConfig>) -> Result<Self, ManagerError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&config.max_workers) {
            return Err(ManagerError::InvalidWorkerCount {
                value: config.max_workers,
            });
        }

        let location_dir = config.location_dir();
        std::fs::create_dir_all(&location_dir).map_err(|source| ManagerError::CreateDir {
            path: location_dir.clone(),
            source,
        })?;

        let ledger = if config.csv_enabled {
            Some(CsvLedger::create(
                &location_dir,
                &config.sanitized_location(),
            )?)
        } else {
            None
        };

        debug!(
            max_workers = config.max_workers,
            max_images = config.max_images,
            csv = config.csv_enabled,
            download = config.download_enabled,
            "creating download manager"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_workers)),
            client: HttpClient::with_timeout(config.timeout),
            ledger,
            next_index: Mutex::new(0),
            stats: Arc::new(DownloadStats::new()),
            handles: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Returns the ledger path, when CSV logging is enabled.
    #[must_use]
    pub fn ledger_path(&self) -> Option<&Path> {
        self.ledger.as_ref().map(CsvLedger::path)
    }

    /// Returns the run statistics.
    #[must_use]
    pub fn stats(&self) -> &DownloadStats {
        &self.stats
    }

    /// Records one discovered URL: assigns the next sequence index and, when
    /// CSV logging is enabled, appends the row and flushes it to disk before
    /// returning.
    ///
    /// Returns `Ok(None)` once the image cap is reached; excess URLs are
    /// discarded without being logged. On a ledger error the index is not
    /// consumed, so the ledger stays gap-free.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the row cannot be durably appended.
    #[instrument(skip(self), fields(url = %url))]
    pub fn record(&self, url: &str) -> Result<Option<DiscoveredImage>, LedgerError> {
        let mut next_index = self
            .next_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(cap) = self.config.max_images {
            if *next_index >= cap {
                debug!(cap, "image cap reached, discarding URL");
                return Ok(None);
            }
        }

        let image = DiscoveredImage::new(*next_index, url);
        if let Some(ledger) = &self.ledger {
            ledger.append(&image)?;
        }
        *next_index += 1;
        drop(next_index);

        self.stats.increment_discovered();
        Ok(Some(image))
    }

    /// Schedules a download for a recorded image, if downloading is enabled.
    ///
    /// Returns without blocking on the download itself, but waits for a
    /// worker permit when the pool is saturated - the back-pressure bound.
    pub async fn maybe_download(&self, image: &DiscoveredImage) {
        if !self.config.download_enabled {
            debug!(
                index = image.sequence_index,
                "downloading disabled, skipping"
            );
            return;
        }

        // Acquire worker permit (blocks while all workers are busy)
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    index = image.sequence_index,
                    "worker pool closed, dropping download"
                );
                return;
            }
        };

        let client = self.client.clone();
        let stats = Arc::clone(&self.stats);
        let target = self.config.image_path(image.sequence_index, &image.url);
        let image = image.clone();

        let handle = tokio::spawn(async move {
            // Permit is dropped when this block exits (RAII)
            let _permit = permit;
            run_download(&client, &image, &target, &stats).await;
        });

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Waits for all outstanding downloads and returns the final statistics.
    pub async fn finish(self) -> DownloadStats {
        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        debug!(task_count = handles.len(), "waiting for downloads to complete");
        for handle in handles {
            // Ignore JoinError - task panics are logged but don't fail the run
            if let Err(e) = handle.await {
                warn!(error = %e, "download task panicked");
            }
        }

        let stats = self.stats;
        info!(
            discovered = stats.discovered(),
            completed = stats.completed(),
            failed = stats.failed(),
            "downloads complete"
        );

        // All tasks are done, so we should have sole ownership of the stats.
        // If not (which would be a bug), rebuild from the atomic values.
        match Arc::try_unwrap(stats) {
            Ok(stats) => stats,
            Err(arc_stats) => {
                let new_stats = DownloadStats::new();
                new_stats
                    .discovered
                    .store(arc_stats.discovered(), Ordering::SeqCst);
                new_stats
                    .completed
                    .store(arc_stats.completed(), Ordering::SeqCst);
                new_stats.failed.store(arc_stats.failed(), Ordering::SeqCst);
                new_stats
            }
        }
    }
}

#[async_trait]
impl UrlSink for DownloadManager {
    async fn accept(&self, url: &str) -> SinkStatus {
        match self.record(url) {
            Ok(Some(image)) => {
                self.maybe_download(&image).await;
                SinkStatus::Accepted
            }
            Ok(None) => SinkStatus::CapReached,
            Err(e) => {
                // Loud: a lost ledger row is silent data loss. The URL is
                // dropped entirely so downloaded files never outrun the
                // ledger; the run continues.
                error!(url = %url, error = %e, "failed to record URL to CSV ledger, URL dropped");
                SinkStatus::Accepted
            }
        }
    }
}

/// Fetches one image and writes it after the fetch fully succeeds.
///
/// Failures are counted and logged with URL and index context; the task is
/// dropped with no retry.
async fn run_download(
    client: &HttpClient,
    image: &DiscoveredImage,
    target: &Path,
    stats: &DownloadStats,
) {
    match client.download_to_file(&image.url, target).await {
        Ok(bytes) => {
            info!(
                index = image.sequence_index,
                path = %target.display(),
                bytes,
                "image downloaded"
            );
            stats.increment_completed();
        }
        Err(e) => {
            warn!(
                index = image.sequence_index,
                url = %image.url,
                error = %e,
                "image download failed"
            );
            stats.increment_failed();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn test_config(dir: &Path) -> RunConfig {
        RunConfig {
            location: "Test Plaza".to_string(),
            headless: true,
            download_dir: dir.to_path_buf(),
            max_images: None,
            max_workers: 5,
            timeout: Duration::from_secs(5),
            csv_enabled: true,
            download_enabled: false,
        }
    }

    #[test]
    fn test_manager_rejects_zero_workers() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.max_workers = 0;

        let result = DownloadManager::new(Arc::new(config));
        assert!(matches!(
            result,
            Err(ManagerError::InvalidWorkerCount { value: 0 })
        ));
    }

    #[test]
    fn test_manager_rejects_excessive_workers() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.max_workers = 101;

        let result = DownloadManager::new(Arc::new(config));
        assert!(matches!(
            result,
            Err(ManagerError::InvalidWorkerCount { value: 101 })
        ));
    }

    #[test]
    fn test_manager_creates_location_dir_and_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(temp_dir.path()));

        let manager = DownloadManager::new(Arc::clone(&config)).unwrap();

        assert!(config.location_dir().is_dir());
        let ledger_path = manager.ledger_path().unwrap();
        assert!(ledger_path.exists());
        assert!(ledger_path.starts_with(config.location_dir()));
    }

    #[test]
    fn test_manager_no_csv_creates_no_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.csv_enabled = false;

        let manager = DownloadManager::new(Arc::new(config)).unwrap();
        assert!(manager.ledger_path().is_none());
    }

    #[test]
    fn test_record_assigns_sequential_indices() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DownloadManager::new(Arc::new(test_config(temp_dir.path()))).unwrap();

        for expected in 0..4 {
            let image = manager
                .record(&format!("https://example.com/{expected}.jpg"))
                .unwrap()
                .unwrap();
            assert_eq!(image.sequence_index, expected);
        }
        assert_eq!(manager.stats().discovered(), 4);
    }

    #[test]
    fn test_record_discards_beyond_cap() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.max_images = Some(2);
        let manager = DownloadManager::new(Arc::new(config)).unwrap();

        assert!(manager.record("https://example.com/u1.jpg").unwrap().is_some());
        assert!(manager.record("https://example.com/u2.jpg").unwrap().is_some());
        assert!(manager.record("https://example.com/u3.jpg").unwrap().is_none());
        // Still discarded on later attempts
        assert!(manager.record("https://example.com/u4.jpg").unwrap().is_none());
        assert_eq!(manager.stats().discovered(), 2);
    }

    #[test]
    fn test_record_cap_zero_accepts_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.max_images = Some(0);
        let manager = DownloadManager::new(Arc::new(config)).unwrap();

        assert!(manager.record("https://example.com/u1.jpg").unwrap().is_none());
        assert_eq!(manager.stats().discovered(), 0);
    }

    #[tokio::test]
    async fn test_accept_reports_cap() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.max_images = Some(1);
        let manager = DownloadManager::new(Arc::new(config)).unwrap();

        assert_eq!(
            manager.accept("https://example.com/u1.jpg").await,
            SinkStatus::Accepted
        );
        assert_eq!(
            manager.accept("https://example.com/u2.jpg").await,
            SinkStatus::CapReached
        );
    }

    #[tokio::test]
    async fn test_maybe_download_noop_when_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(temp_dir.path()));
        let manager = DownloadManager::new(Arc::clone(&config)).unwrap();

        let image = manager.record("https://example.com/u1.jpg").unwrap().unwrap();
        manager.maybe_download(&image).await;

        let stats = manager.finish().await;
        assert_eq!(stats.discovered(), 1);
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.failed(), 0);
    }

    #[test]
    fn test_download_stats_default() {
        let stats = DownloadStats::default();
        assert_eq!(stats.discovered(), 0);
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.failed(), 0);
    }

    #[test]
    fn test_download_stats_increment() {
        let stats = DownloadStats::new();

        stats.increment_discovered();
        stats.increment_discovered();
        stats.increment_completed();
        stats.increment_failed();
        stats.increment_failed();
        stats.increment_failed();

        assert_eq!(stats.discovered(), 2);
        assert_eq!(stats.completed(), 1);
        assert_eq!(stats.failed(), 3);
    }

    #[test]
    fn test_download_stats_thread_safe() {
        use std::thread;

        let stats = Arc::new(DownloadStats::new());
        let mut handles = Vec::new();

        for _ in 0..10 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats.increment_discovered();
                    stats.increment_completed();
                    stats.increment_failed();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.discovered(), 1000);
        assert_eq!(stats.completed(), 1000);
        assert_eq!(stats.failed(), 1000);
    }

    #[test]
    fn test_manager_error_display() {
        let error = ManagerError::InvalidWorkerCount { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains("invalid worker count"));
        assert!(msg.contains('0'));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_manager_create_dir_error_display() {
        let error = ManagerError::CreateDir {
            path: PathBuf::from("/nonexistent/dir"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.to_string().contains("/nonexistent/dir"));
    }
}
