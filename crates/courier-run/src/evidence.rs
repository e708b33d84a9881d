//! Evidence reporter seam and the filesystem implementation.

use crate::model::RunId;
use async_trait::async_trait;
use courier_workflow::Step;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

/// Evidence storage errors.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    /// Filesystem failure while persisting evidence
    #[error("evidence write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives screenshots and progress events for runs.
///
/// Evidence is best effort everywhere: sink failures are logged by callers
/// and never affect run state.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Persist a screenshot; returns a handle (path or key) for the run
    /// record.
    async fn record_screenshot(
        &self,
        run_id: RunId,
        label: &str,
        image_png: &[u8],
    ) -> Result<String, EvidenceError>;

    /// Record a progress event.
    async fn record_event(&self, run_id: RunId, step: Step, detail: &str);
}

/// Writes evidence under `<root>/<run_id>/`.
pub struct FsEvidenceSink {
    root: PathBuf,
    seq: AtomicU32,
}

impl FsEvidenceSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seq: AtomicU32::new(0),
        }
    }
}

/// Keep labels filesystem-safe.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[async_trait]
impl EvidenceSink for FsEvidenceSink {
    async fn record_screenshot(
        &self,
        run_id: RunId,
        label: &str,
        image_png: &[u8],
    ) -> Result<String, EvidenceError> {
        let dir = self.root.join(run_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let path = dir.join(format!("{seq:04}-{}.png", sanitize(label)));
        tokio::fs::write(&path, image_png).await?;
        Ok(path.display().to_string())
    }

    async fn record_event(&self, run_id: RunId, step: Step, detail: &str) {
        tracing::info!(%run_id, step = %step, detail, "progress");
    }
}

/// Sink that drops everything; used by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvidenceSink;

#[async_trait]
impl EvidenceSink for NullEvidenceSink {
    async fn record_screenshot(
        &self,
        _run_id: RunId,
        label: &str,
        _image_png: &[u8],
    ) -> Result<String, EvidenceError> {
        Ok(label.to_string())
    }

    async fn record_event(&self, _run_id: RunId, _step: Step, _detail: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn screenshots_land_under_the_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsEvidenceSink::new(dir.path());
        let run_id = RunId::new();

        let handle = sink
            .record_screenshot(run_id, "save/err or", b"png-bytes")
            .await
            .unwrap();
        assert!(handle.contains(&run_id.to_string()));
        assert!(handle.ends_with("save-err-or.png"));
        assert_eq!(std::fs::read(&handle).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn sequence_numbers_keep_capture_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsEvidenceSink::new(dir.path());
        let run_id = RunId::new();

        let first = sink.record_screenshot(run_id, "a", b"1").await.unwrap();
        let second = sink.record_screenshot(run_id, "b", b"2").await.unwrap();
        assert!(first < second);
    }
}
