//! Filename sanitization and image path derivation.
//!
//! This module provides utilities for turning location names into safe file
//! system components and deriving per-image filenames from sequence indices
//! and URL extensions.

use url::Url;

/// Extension used when the URL path carries none (gallery URLs usually don't).
const DEFAULT_EXTENSION: &str = ".jpg";

/// Sanitizes a string for use as a file or directory name component.
///
/// Invalid characters, whitespace, and control characters become single
/// underscores; runs of separators collapse and leading/trailing separators
/// are trimmed.
#[must_use]
pub(crate) fn sanitize_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Extracts a lowercase file extension (including the dot) from a URL path.
///
/// The last path segment is percent-decoded before inspection. Returns `None`
/// for missing, single-character, or implausibly long extensions.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last_segment).unwrap_or_else(|_| last_segment.into());
    let dot_index = decoded.rfind('.')?;
    let ext = &decoded[dot_index..];
    if ext.len() <= 1 || ext.len() > 12 {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Builds the filename for a downloaded image: `<location>_<index><ext>`.
///
/// The sequence index keeps names collision-free across a run.
#[must_use]
pub(crate) fn image_filename(location: &str, sequence_index: u64, url: &str) -> String {
    let extension =
        extension_from_url(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!(
        "{}_{sequence_index}{extension}",
        sanitize_component(location)
    )
}
