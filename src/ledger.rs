//! Append-only CSV record of discovered image URLs.
//!
//! One ledger file exists per scraping run, created before discovery starts
//! and named from the sanitized location and the run start time. Every
//! appended row is flushed before the call returns, so a killed process loses
//! at most in-flight downloads, never already-recorded URLs.
//!
//! # Concurrency
//!
//! A single mutex guards exactly the serialize+write+flush critical section.
//! It is never held across network I/O, so a slow fetch cannot stall
//! recording.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Timestamp format for ledger rows.
const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format for the run-scoped ledger filename.
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that can occur while creating or appending to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger file could not be created.
    #[error("failed to create ledger {path}: {source}")]
    Create {
        /// The ledger path that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A row could not be written.
    #[error("failed to append row {index} to ledger {path}: {source}")]
    Append {
        /// The ledger path.
        path: PathBuf,
        /// Sequence index of the row that failed.
        index: u64,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Buffered rows could not be flushed to the file.
    #[error("failed to flush ledger {path}: {source}")]
    Flush {
        /// The ledger path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// A single image URL surfaced by the gallery navigator.
///
/// Immutable once created. Sequence indices are unique and strictly
/// increasing in discovery order, starting at 0.
#[derive(Debug, Clone)]
pub struct DiscoveredImage {
    /// Position in discovery order, assigned at record time.
    pub sequence_index: u64,
    /// High-resolution image URL.
    pub url: String,
    /// Wall-clock time of discovery.
    pub discovered_at: DateTime<Local>,
}

impl DiscoveredImage {
    /// Creates a new discovery record stamped with the current time.
    #[must_use]
    pub fn new(sequence_index: u64, url: impl Into<String>) -> Self {
        Self {
            sequence_index,
            url: url.into(),
            discovered_at: Local::now(),
        }
    }
}

/// Serialized form of one ledger row; field order is the column order.
#[derive(Serialize)]
struct LedgerRow<'a> {
    index: u64,
    image_url: &'a str,
    timestamp: String,
}

/// Append-only CSV ledger for one scraping run.
///
/// Shareable across threads; the internal mutex serializes appends so
/// concurrent callers never interleave partial rows.
#[derive(Debug)]
pub struct CsvLedger {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvLedger {
    /// Creates the ledger file for a run, writing the header row immediately.
    ///
    /// The file lands at `<dir>/<sanitized>_urls_<run-timestamp>.csv`. The
    /// directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Create`] if the file cannot be created or
    /// [`LedgerError::Flush`] if the header cannot be flushed.
    #[instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn create(dir: &Path, sanitized_location: &str) -> Result<Self, LedgerError> {
        let stamp = Local::now().format(FILE_STAMP_FORMAT);
        let path = dir.join(format!("{sanitized_location}_urls_{stamp}.csv"));
        Self::create_at(path)
    }

    /// Creates a ledger at an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Create`] if the file cannot be created or
    /// [`LedgerError::Flush`] if the header cannot be flushed.
    pub fn create_at(path: PathBuf) -> Result<Self, LedgerError> {
        let file = File::create(&path).map_err(|source| LedgerError::Create {
            path: path.clone(),
            source,
        })?;

        // Header is written explicitly so the file carries it even when a run
        // discovers nothing; rows are serialized without per-row headers.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(["index", "image_url", "timestamp"])
            .map_err(|source| LedgerError::Append {
                path: path.clone(),
                index: 0,
                source,
            })?;
        writer.flush().map_err(|source| LedgerError::Flush {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "created CSV ledger");
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    /// Appends one row and flushes it to the file before returning.
    ///
    /// The row is durably visible on disk once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Append`] if serialization/writing fails or
    /// [`LedgerError::Flush`] if the flush fails.
    pub fn append(&self, image: &DiscoveredImage) -> Result<(), LedgerError> {
        let row = LedgerRow {
            index: image.sequence_index,
            image_url: &image.url,
            timestamp: image.discovered_at.format(ROW_TIME_FORMAT).to_string(),
        };

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        writer
            .serialize(&row)
            .map_err(|source| LedgerError::Append {
                path: self.path.clone(),
                index: image.sequence_index,
                source,
            })?;
        writer.flush().map_err(|source| LedgerError::Flush {
            path: self.path.clone(),
            source,
        })?;
        drop(writer);

        if image.sequence_index < 5 || (image.sequence_index + 1) % 10 == 0 {
            info!(index = image.sequence_index, "saved URL to ledger");
        } else {
            debug!(index = image.sequence_index, url = %image.url, "saved URL to ledger");
        }
        Ok(())
    }

    /// Returns the ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
