//! Run Orchestrator: idempotent submission and status queries.

use crate::model::{IdempotencyKey, Manifest, Run, RunId, RunStatus};
use crate::queue::{QueueError, WorkQueue};
use crate::store::RunStore;

/// Submission errors surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Manifest failed validation; never enqueued
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The work queue cannot accept the run
    #[error("service saturated, retry later")]
    Saturated,
}

impl From<QueueError> for SubmitError {
    fn from(_: QueueError) -> Self {
        SubmitError::Saturated
    }
}

/// What a submission resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Whether a new run was created (false when deduplicated)
    pub created: bool,
}

/// Accepts manifests, deduplicates by listing identity, and hands new runs
/// to the worker queue.
#[derive(Clone)]
pub struct Orchestrator {
    store: RunStore,
    queue: WorkQueue,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: RunStore, queue: WorkQueue) -> Self {
        Self { store, queue }
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Submit a manifest.
    ///
    /// A non-terminal run under the same idempotency key is returned as-is
    /// with no new work; so is a terminal success (no-op resubmission). Only
    /// a terminal failure makes room for a fresh run under the same key.
    ///
    /// # Errors
    /// `InvalidManifest` before anything is persisted; `Saturated` when the
    /// queue cannot take the unit.
    pub fn submit(&self, manifest: Manifest) -> Result<SubmitOutcome, SubmitError> {
        manifest
            .validate()
            .map_err(SubmitError::InvalidManifest)?;

        let key = IdempotencyKey::derive(&manifest);
        if let Some(existing) = self.store.find_by_key(&key) {
            if !existing.status.is_terminal() || existing.status == RunStatus::Succeeded {
                tracing::info!(
                    run_id = %existing.run_id,
                    status = %existing.status,
                    key = %key,
                    "submission deduplicated"
                );
                return Ok(SubmitOutcome {
                    run_id: existing.run_id,
                    status: existing.status,
                    created: false,
                });
            }
            tracing::info!(
                failed_run = %existing.run_id,
                key = %key,
                "previous run failed, accepting a fresh one"
            );
        }

        let run = Run::new(manifest);
        let run_id = run.run_id;
        self.store.insert(run);
        self.queue.enqueue(run_id)?;
        tracing::info!(%run_id, key = %key, "run accepted");

        Ok(SubmitOutcome {
            run_id,
            status: RunStatus::Queued,
            created: true,
        })
    }

    /// Fetch a run by id.
    #[must_use]
    pub fn get(&self, run_id: RunId) -> Option<Run> {
        self.store.get(run_id)
    }
}
