//! Browser automation for walking a place's photo gallery.
//!
//! The [`GalleryNavigator`] launches Chrome over the DevTools Protocol,
//! searches Google Maps for the configured location, opens its photo
//! gallery, and advances photo by photo. Every newly surfaced image URL is
//! rewritten to its highest-resolution form and handed to a [`UrlSink`] in
//! discovery order; navigation stops when the sink reports the image cap,
//! the Next control disappears, or repeated advances surface nothing new.
//!
//! Browser automation is inherently single-threaded per session: one control
//! path drives the page while download workers run elsewhere.

mod error;
mod selectors;

pub use error::NavigatorError;

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures_util::StreamExt;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;
use crate::manager::{SinkStatus, UrlSink};
use self::selectors::{
    GALLERY_INDICATORS, GALLERY_THUMBNAILS, IMAGE_SOURCES_JS, MAPS_URL, NEXT_BUTTONS,
    PHOTOS_BUTTONS, PLACE_HEADER, PLACE_INDICATORS, RESULT_LINKS, SEARCH_BOX,
};

/// Matches the resolution suffix Maps appends to gallery image URLs.
#[allow(clippy::expect_used)]
static RESOLUTION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=w\d+-h\d+").expect("resolution suffix regex is valid"));

/// Poll interval while waiting for an element to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Pause after navigation-triggering clicks so the page can settle.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Pause after advancing to the next photo before reading sources.
const ADVANCE_DELAY: Duration = Duration::from_millis(1500);

/// Consecutive advances without a new image before discovery stops.
const MAX_STALE_ROUNDS: usize = 30;

/// Hardening flags matching what gallery pages tolerate in automation.
const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
];

/// Drives a browser session through search, gallery entry, and photo
/// enumeration for one configured location.
#[derive(Debug)]
pub struct GalleryNavigator {
    config: Arc<RunConfig>,
}

impl GalleryNavigator {
    /// Creates a navigator for the configured run.
    #[must_use]
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self { config }
    }

    /// Runs the full discovery flow and returns the number of URLs the sink
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`NavigatorError`] when the browser cannot be launched, the
    /// search produces no usable place, the gallery cannot be opened, or a
    /// wait condition times out. All of these abort the run.
    #[instrument(skip(self, sink), fields(location = %self.config.location))]
    pub async fn run(&self, sink: &dyn UrlSink) -> Result<u64, NavigatorError> {
        let (mut browser, handler_task, page) = self.launch().await?;

        let result = self.drive(&page, sink).await;

        // Best-effort teardown; discovery results stand regardless
        if let Err(e) = browser.close().await {
            debug!(error = %e, "error closing browser");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "error waiting for browser exit");
        }
        handler_task.abort();

        result
    }

    /// Launches Chrome and opens the Maps landing page.
    async fn launch(
        &self,
    ) -> Result<(Browser, JoinHandle<()>, Page), NavigatorError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .args(CHROME_ARGS.iter().copied());
        if !self.config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|message| NavigatorError::Launch { message })?;

        info!(headless = self.config.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // The handler stream must be driven for any page command to resolve
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error (continuing)");
                }
            }
        });

        let page = browser.new_page(MAPS_URL).await?;
        page.wait_for_navigation().await?;

        Ok((browser, handler_task, page))
    }

    /// Search, open the gallery, and enumerate photos.
    async fn drive(&self, page: &Page, sink: &dyn UrlSink) -> Result<u64, NavigatorError> {
        self.search_location(page).await?;
        self.open_photo_gallery(page).await?;
        self.collect_image_urls(page, sink).await
    }

    /// Types the location into the Maps search box and lands on a place page.
    async fn search_location(&self, page: &Page) -> Result<(), NavigatorError> {
        info!(location = %self.config.location, "searching for location");

        let search_box = self.wait_for_element(page, SEARCH_BOX, "search", "search box").await?;
        search_box.click().await?;
        search_box.type_str(&self.config.location).await?;
        search_box.press_key("Enter").await?;
        sleep(SETTLE_DELAY).await;

        // Exact matches land directly on the place page
        if page.find_element(PLACE_HEADER).await.is_ok() {
            info!("search landed directly on place page");
            return Ok(());
        }

        // Otherwise click the first usable entry in the result list
        for selector in RESULT_LINKS {
            if let Some(element) = find_first(page, selector).await {
                if click_element(&element).await {
                    debug!(selector, "clicked search result");
                    sleep(SETTLE_DELAY).await;
                    return Ok(());
                }
            }
        }

        // Some queries skip the result list entirely; accept any place page
        for selector in PLACE_INDICATORS {
            if page.find_element(*selector).await.is_ok() {
                info!("already on a place page");
                return Ok(());
            }
        }

        warn!(location = %self.config.location, "no search result matched");
        Err(NavigatorError::SearchFailed {
            location: self.config.location.clone(),
        })
    }

    /// Opens the photos section and enters the single-photo gallery view.
    async fn open_photo_gallery(&self, page: &Page) -> Result<(), NavigatorError> {
        // Open the photos section of the place page
        for selector in PHOTOS_BUTTONS {
            if let Some(element) = find_first(page, selector).await {
                if click_element(&element).await {
                    debug!(selector, "opened photos section");
                    sleep(SETTLE_DELAY).await;
                    break;
                }
            }
        }

        if self.in_gallery_view(page).await {
            return Ok(());
        }

        // Click a thumbnail to switch from the grid to the gallery view
        let deadline = Instant::now() + self.config.timeout;
        loop {
            for selector in GALLERY_THUMBNAILS {
                if let Some(element) = find_first(page, selector).await {
                    if click_element(&element).await {
                        debug!(selector, "clicked thumbnail to enter gallery");
                        sleep(SETTLE_DELAY).await;
                        break;
                    }
                }
            }

            if self.in_gallery_view(page).await {
                info!("entered gallery view");
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }

        warn!(location = %self.config.location, "could not enter gallery view");
        Err(NavigatorError::GalleryUnavailable {
            location: self.config.location.clone(),
        })
    }

    /// Returns true while the single-photo gallery view is open.
    async fn in_gallery_view(&self, page: &Page) -> bool {
        for selector in GALLERY_INDICATORS {
            if page.find_element(*selector).await.is_ok() {
                return true;
            }
        }
        false
    }

    /// Walks the gallery, handing each new high-resolution URL to the sink.
    async fn collect_image_urls(
        &self,
        page: &Page,
        sink: &dyn UrlSink,
    ) -> Result<u64, NavigatorError> {
        info!("starting image URL extraction");

        let mut seen: HashSet<String> = HashSet::new();
        let mut discovered = 0u64;
        let mut stale_rounds = 0usize;

        loop {
            let sources: Vec<String> = page
                .evaluate(IMAGE_SOURCES_JS)
                .await?
                .into_value()?;

            let mut found_new = false;
            for source in sources {
                let url = to_high_res(&source);
                if !seen.insert(url.clone()) {
                    continue;
                }
                found_new = true;

                match sink.accept(&url).await {
                    SinkStatus::Accepted => {
                        discovered += 1;
                        debug!(discovered, url = %url, "discovered image URL");
                    }
                    SinkStatus::CapReached => {
                        info!(discovered, "image cap reached, stopping discovery");
                        return Ok(discovered);
                    }
                }
            }

            if found_new {
                stale_rounds = 0;
            } else {
                stale_rounds += 1;
                if stale_rounds >= MAX_STALE_ROUNDS {
                    info!(
                        discovered,
                        "no new images after repeated advances, stopping"
                    );
                    break;
                }
            }

            if !self.advance(page).await {
                info!(discovered, "next control unavailable, end of gallery");
                break;
            }
            sleep(ADVANCE_DELAY).await;
        }

        Ok(discovered)
    }

    /// Clicks the Next control; returns false when the gallery has no more.
    async fn advance(&self, page: &Page) -> bool {
        for selector in NEXT_BUTTONS {
            if let Some(element) = find_first(page, selector).await {
                if click_element(&element).await {
                    return true;
                }
            }
        }
        false
    }

    /// Polls for an element until the configured timeout elapses.
    async fn wait_for_element(
        &self,
        page: &Page,
        selector: &str,
        phase: &'static str,
        what: &'static str,
    ) -> Result<Element, NavigatorError> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(NavigatorError::timeout(
                    phase,
                    what,
                    self.config.timeout.as_secs(),
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Finds the first element matching a selector, or `None`.
async fn find_first(page: &Page, selector: &str) -> Option<Element> {
    page.find_element(selector).await.ok()
}

/// Scrolls an element into view and clicks it; false when the click fails.
async fn click_element(element: &Element) -> bool {
    if let Err(e) = element.scroll_into_view().await {
        debug!(error = %e, "scroll into view failed");
    }
    match element.click().await {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "click failed");
            false
        }
    }
}

/// Rewrites a gallery image URL to its highest-resolution form.
fn to_high_res(url: &str) -> String {
    RESOLUTION_SUFFIX.replace(url, "=w0-h0").into_owned()
}
