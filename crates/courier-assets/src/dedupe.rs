//! Order-preserving, first-wins URL deduplication with a drop audit.

use crate::normalize::NormalizedAsset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical tag naming the batch being deduplicated (e.g. floor plans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchTag {
    /// Floor plan import batch
    Floorplans,
    /// Auxiliary file import batch
    Files,
}

impl std::fmt::Display for BatchTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchTag::Floorplans => write!(f, "floorplans"),
            BatchTag::Files => write!(f, "files"),
        }
    }
}

/// Why a URL was dropped from a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Canonical forms matched
    DuplicateUrl,
    /// Decoded filenames matched case-insensitively
    DuplicateFilename,
}

/// Audit record for one dropped URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedUrl {
    /// The URL that was removed
    pub dropped_url: String,
    /// Collision kind
    pub reason: DropReason,
    /// The earlier URL it collided with
    pub kept_url: String,
}

/// Result of deduplicating one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeReport {
    /// Which batch this report covers
    pub batch: BatchTag,
    /// Deduplicated URLs, original order and original strings preserved
    pub kept: Vec<String>,
    /// Normalized record per kept URL
    pub assets: Vec<NormalizedAsset>,
    /// Number of duplicates removed
    pub duplicates_removed: usize,
    /// One audit entry per dropped URL
    pub dropped: Vec<DroppedUrl>,
}

impl DedupeReport {
    /// Total input size (kept + dropped).
    #[inline]
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.kept.len() + self.dropped.len()
    }
}

/// Deduplicate an ordered list of URLs.
///
/// Two URLs collide when their canonical forms match, or when their decoded
/// filenames match case-insensitively after trimming. The first occurrence
/// wins and input order is preserved. Malformed URLs are never dropped;
/// their canonical form is the raw string and they carry no filename, so
/// they collide only on exact repetition.
#[must_use]
pub fn dedupe(urls: &[String], batch: BatchTag) -> DedupeReport {
    let mut kept = Vec::with_capacity(urls.len());
    let mut assets = Vec::with_capacity(urls.len());
    let mut dropped = Vec::new();

    // canonical form / filename match key -> first URL that claimed it
    let mut by_canonical: HashMap<String, String> = HashMap::new();
    let mut by_filename: HashMap<String, String> = HashMap::new();

    for url in urls {
        let asset = NormalizedAsset::from_url(url);

        if let Some(kept_url) = by_canonical.get(&asset.canonical_url) {
            dropped.push(DroppedUrl {
                dropped_url: url.clone(),
                reason: DropReason::DuplicateUrl,
                kept_url: kept_url.clone(),
            });
            continue;
        }
        if asset.has_filename() {
            if let Some(kept_url) = by_filename.get(&asset.match_key) {
                dropped.push(DroppedUrl {
                    dropped_url: url.clone(),
                    reason: DropReason::DuplicateFilename,
                    kept_url: kept_url.clone(),
                });
                continue;
            }
        }

        by_canonical.insert(asset.canonical_url.clone(), url.clone());
        if asset.has_filename() {
            by_filename.insert(asset.match_key.clone(), url.clone());
        }
        kept.push(url.clone());
        assets.push(asset);
    }

    let duplicates_removed = dropped.len();
    DedupeReport {
        batch,
        kept,
        assets,
        duplicates_removed,
        dropped,
    }
}
