//! Progress/evidence collaborator seam.
//!
//! The engine reports what it is doing and captures evidence at failure
//! points; where those records land (filesystem, object store) is the
//! collaborator's concern.

use crate::step::Step;
use async_trait::async_trait;

/// Receives progress events and failure evidence for one run.
#[async_trait]
pub trait ProgressListener: Send + Sync {
    /// A step milestone or per-asset outcome.
    async fn on_progress(&self, step: Step, detail: &str);

    /// A screenshot captured at a failure point.
    async fn on_evidence(&self, label: &str, image_png: &[u8]);
}

/// Listener that drops everything; used by tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

#[async_trait]
impl ProgressListener for NullListener {
    async fn on_progress(&self, _step: Step, _detail: &str) {}
    async fn on_evidence(&self, _label: &str, _image_png: &[u8]) {}
}
