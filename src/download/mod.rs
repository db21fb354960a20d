//! HTTP image fetching with buffered writes.
//!
//! This module provides functionality for fetching gallery images over
//! HTTP/HTTPS. Bodies are fully buffered before anything touches disk, so a
//! failed fetch never leaves a partial file at the target path.
//!
//! # Features
//!
//! - Buffered downloads (write happens only after the full body arrived)
//! - Configurable total timeout per fetch
//! - Browser-like User-Agent and Google Maps referer on every request
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use mapshot_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let bytes = client
//!     .download_to_file(
//!         "https://lh5.googleusercontent.com/p/photo=w0-h0",
//!         Path::new("./downloaded_images/plaza_0.jpg"),
//!     )
//!     .await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub(crate) mod filename;

pub use client::{BROWSER_USER_AGENT, HttpClient};
pub use error::DownloadError;
