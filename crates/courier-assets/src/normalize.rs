//! Per-URL normalization: canonical form and filename extraction.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

/// A source URL reduced to the forms used for duplicate detection.
///
/// Derived and ephemeral: scoped to one import batch, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAsset {
    /// The URL exactly as supplied by the caller
    pub original_url: String,
    /// Query/fragment-stripped, slash-normalized form
    pub canonical_url: String,
    /// Percent-decoded last non-empty path segment; empty if absent
    pub decoded_filename: String,
    /// Lowercased, trimmed filename used for case-insensitive collision
    pub match_key: String,
}

impl NormalizedAsset {
    /// Normalize a single URL.
    ///
    /// A URL that fails to parse is passed through: canonical form falls
    /// back to the raw string and the filename is empty, so it can never
    /// collide with a well-formed URL by filename.
    #[must_use]
    pub fn from_url(original: &str) -> Self {
        match Url::parse(original) {
            Ok(parsed) => {
                let canonical = canonical_from_parsed(&parsed);
                let filename = decoded_filename_from_parsed(&parsed);
                let match_key = filename.trim().to_lowercase();
                Self {
                    original_url: original.to_string(),
                    canonical_url: canonical,
                    decoded_filename: filename,
                    match_key,
                }
            }
            Err(_) => Self {
                original_url: original.to_string(),
                canonical_url: original.to_string(),
                decoded_filename: String::new(),
                match_key: String::new(),
            },
        }
    }

    /// Whether this asset carries a usable filename for collision checks.
    #[inline]
    #[must_use]
    pub fn has_filename(&self) -> bool {
        !self.match_key.is_empty()
    }
}

/// Canonicalize a URL string: drop query and fragment, collapse repeated
/// path separators, keep origin plus normalized path.
///
/// Returns the input unchanged when it does not parse as a URL.
#[must_use]
pub fn canonical_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => canonical_from_parsed(&parsed),
        Err(_) => raw.to_string(),
    }
}

/// Extract the percent-decoded last non-empty path segment.
///
/// Returns an empty string for URLs without a path segment or that fail
/// to parse.
#[must_use]
pub fn decoded_filename(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => decoded_filename_from_parsed(&parsed),
        Err(_) => String::new(),
    }
}

fn canonical_from_parsed(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    let path = collapse_slashes(url.path());
    format!("{origin}{path}")
}

fn decoded_filename_from_parsed(url: &Url) -> String {
    let last = url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back();
    match last {
        Some(segment) => percent_decode_str(segment)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
        None => String::new(),
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_query_and_fragment() {
        assert_eq!(
            canonical_url("https://cdn.example.com/plans/a.pdf?x=1#frag"),
            "https://cdn.example.com/plans/a.pdf"
        );
    }

    #[test]
    fn canonical_collapses_repeated_separators() {
        assert_eq!(
            canonical_url("https://cdn.example.com//plans///a.pdf"),
            "https://cdn.example.com/plans/a.pdf"
        );
    }

    #[test]
    fn canonical_passes_malformed_through() {
        assert_eq!(canonical_url("not a url"), "not a url");
    }

    #[test]
    fn filename_is_percent_decoded() {
        assert_eq!(
            decoded_filename("https://cdn.example.com/plans/floor%20plan.pdf"),
            "floor plan.pdf"
        );
    }

    #[test]
    fn filename_skips_trailing_slash() {
        assert_eq!(
            decoded_filename("https://cdn.example.com/plans/a.pdf/"),
            "a.pdf"
        );
    }

    #[test]
    fn filename_empty_when_no_segments() {
        assert_eq!(decoded_filename("https://cdn.example.com/"), "");
        assert_eq!(decoded_filename("%%%garbage"), "");
    }

    #[test]
    fn normalized_asset_match_key_is_case_insensitive() {
        let asset = NormalizedAsset::from_url("https://cdn.example.com/A.PDF");
        assert_eq!(asset.match_key, "a.pdf");
        assert!(asset.has_filename());
    }

    #[test]
    fn malformed_url_has_no_match_key() {
        let asset = NormalizedAsset::from_url("::::");
        assert_eq!(asset.canonical_url, "::::");
        assert!(!asset.has_filename());
    }
}
