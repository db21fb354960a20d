//! DOM selectors and in-page scripts for Google Maps.
//!
//! Maps ships obfuscated, frequently rotated class names, so every lookup
//! carries a fallback list ordered from most to least specific. Attribute
//! selectors (aria labels, jsaction hooks) outlive class rotations and come
//! first wherever possible.

/// The Maps entry point.
pub(crate) const MAPS_URL: &str = "https://www.google.com/maps";

/// The search input on the Maps landing page.
pub(crate) const SEARCH_BOX: &str =
    "input#searchboxinput, input[name='q'], input[aria-label*='Search']";

/// Heading shown when a search lands directly on a place page.
pub(crate) const PLACE_HEADER: &str = "h1.DUwDvf, div.fontHeadlineLarge, div[role='heading']";

/// Clickable entries in a search result list.
pub(crate) const RESULT_LINKS: &[&str] = &[
    "div.Nv2PK, div.hfpxzc, a.hfpxzc",
    "div[role='article'], a[jsaction*='placepage']",
];

/// Elements that indicate the search already landed on a place page.
pub(crate) const PLACE_INDICATORS: &[&str] = &[
    "button[data-item-id='photos'], button[aria-label*='photo' i]",
    "button[jsaction*='pane.rating.category']",
];

/// Buttons and links that open the photos section of a place page.
pub(crate) const PHOTOS_BUTTONS: &[&str] = &[
    "button[aria-label*='photo' i], button[data-item-id*='photo' i]",
    "a[aria-label*='photo' i], a[data-item-id*='photo' i]",
    "a[data-tab='images'], a[data-tab='photos']",
    "button[jsaction*='photo'], button[jsaction*='image']",
];

/// Elements present only while the single-photo gallery view is open.
pub(crate) const GALLERY_INDICATORS: &[&str] = &[
    "button[aria-label='Next photo'], button[aria-label='Next']",
    "div[role='dialog'][aria-label*='photo']",
];

/// Thumbnails clicked to enter the gallery view from the photos grid.
pub(crate) const GALLERY_THUMBNAILS: &[&str] = &[
    "div[role='img']",
    "img[src*='googleusercontent']",
];

/// The control that advances the gallery to the next photo.
pub(crate) const NEXT_BUTTONS: &[&str] = &[
    "button[aria-label='Next photo'], button[aria-label='Next']",
    "button[aria-label*='next' i]",
    "[jsaction*='pane.nextbatch']",
];

/// Collects the sources of all gallery-hosted images on the page.
///
/// Selector-based extraction of "the current photo" breaks whenever Maps
/// rotates gallery classes; pulling every `googleusercontent` image source
/// and deduplicating on the Rust side survives those rotations.
pub(crate) const IMAGE_SOURCES_JS: &str = "\
    Array.from(document.querySelectorAll('img'))\
        .filter(img => img.src && img.src.includes('googleusercontent'))\
        .map(img => img.src)";
