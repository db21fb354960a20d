//! HTTP client wrapper for fetching gallery images.
//!
//! This module provides the `HttpClient` struct which handles buffered image
//! fetches with proper timeout configuration and error handling. The full
//! response body is held in memory before any file is created, so a failed
//! fetch never leaves a partial file behind.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::DownloadError;

/// Browser User-Agent sent on every image fetch.
///
/// Gallery image hosts serve different (sometimes empty) responses to
/// non-browser clients, so the client identifies as a current Chrome.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Referer sent on every image fetch; image hosts expect gallery traffic.
const MAPS_REFERER: &str = "https://www.google.com/maps";

/// Default HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default total fetch timeout (30 seconds).
const FETCH_TIMEOUT_SECS: u64 = 30;

/// HTTP client for fetching images with buffered bodies.
///
/// This client is designed to be created once and cloned into worker tasks,
/// taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with the default 30 second timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with an explicit total fetch timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(MAPS_REFERER));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .gzip(true)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Fetches a URL and returns the fully buffered response body.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    #[must_use = "fetched bytes are the downloaded image"]
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        debug!("starting fetch");

        // Validate URL
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url.to_string()))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        debug!(bytes = bytes.len(), "fetch complete");
        Ok(bytes.to_vec())
    }

    /// Fetches a URL and writes the body to `target` after the fetch fully
    /// succeeds.
    ///
    /// Returns the number of bytes written. No file exists at `target` unless
    /// the whole body arrived; a failed write removes the target best-effort.
    ///
    /// # Errors
    ///
    /// Returns the same fetch errors as [`fetch_bytes`](Self::fetch_bytes),
    /// plus [`DownloadError::Io`] if writing the file fails.
    #[must_use = "byte count confirms the file was written"]
    #[instrument(skip(self), fields(url = %url, target = %target.display()))]
    pub async fn download_to_file(
        &self,
        url: &str,
        target: &Path,
    ) -> Result<u64, DownloadError> {
        let bytes = self.fetch_bytes(url).await?;

        if let Err(e) = tokio::fs::write(target, &bytes).await {
            // Remove whatever the failed write left behind
            let _ = tokio::fs::remove_file(target).await;
            return Err(DownloadError::io(target.to_path_buf(), e));
        }

        info!(
            path = %target.display(),
            bytes = bytes.len(),
            "image saved"
        );
        Ok(bytes.len() as u64)
    }
}
