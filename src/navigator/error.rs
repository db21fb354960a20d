//! Error types for the gallery navigator.
//!
//! Navigation failures are fatal to a run: the browser either reached the
//! photo gallery or the whole scrape is aborted with a nonzero exit.

use thiserror::Error;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum NavigatorError {
    /// The browser configuration could not be built.
    #[error("failed to configure browser: {message}")]
    Launch {
        /// Builder error message.
        message: String,
    },

    /// Underlying Chrome DevTools Protocol error.
    #[error("browser automation error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// A wait condition did not materialize within the configured timeout.
    #[error("timed out after {timeout_secs}s waiting for {what} during {phase}")]
    Timeout {
        /// The navigation phase (search, photos, gallery).
        phase: &'static str,
        /// What was being waited for.
        what: &'static str,
        /// The configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The location search produced no clickable result.
    #[error("no search result found for location '{location}'")]
    SearchFailed {
        /// The location that was searched.
        location: String,
    },

    /// The photo gallery could not be opened.
    #[error("could not open photo gallery for location '{location}'")]
    GalleryUnavailable {
        /// The location whose gallery was sought.
        location: String,
    },

    /// An in-page evaluation returned a value that could not be decoded.
    #[error("failed to decode in-page evaluation result: {0}")]
    Decode(#[from] serde_json::Error),
}

impl NavigatorError {
    /// Creates a timeout error for a navigation phase.
    pub(crate) fn timeout(phase: &'static str, what: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            phase,
            what,
            timeout_secs,
        }
    }
}
