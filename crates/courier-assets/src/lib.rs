//! Courier Assets - URL normalization and deduplication
//!
//! Normalizes candidate source URLs before any remote interaction:
//! - Canonical form (query/fragment stripped, path separators collapsed)
//! - Percent-decoded filename extraction
//! - Order-preserving, first-wins deduplication with a drop audit
//!
//! Malformed URLs are passed through unchanged so that later validation can
//! surface the error explicitly instead of silently dropping input.

#![warn(unreachable_pub)]

pub mod dedupe;
pub mod normalize;

pub use dedupe::{dedupe, BatchTag, DedupeReport, DropReason, DroppedUrl};
pub use normalize::{canonical_url, decoded_filename, NormalizedAsset};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
