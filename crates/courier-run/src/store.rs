//! In-memory run store with monotonic status updates and TTL retention.
//!
//! Updates are last-writer-wins read-modify-write under the shard lock;
//! there is no CAS fencing across readers. With the single worker this is
//! safe today; the API is shaped so optimistic versioning can be added.

use crate::model::{IdempotencyKey, ProgressEvent, Run, RunId, RunStatus};
use chrono::{Duration as ChronoDuration, Utc};
use courier_workflow::Step;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Store access errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Unknown or already swept run
    #[error("run {0} not found")]
    NotFound(RunId),

    /// Status regression rejected
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: RunStatus,
        /// Rejected target
        to: RunStatus,
    },
}

/// Default retention for terminal runs.
pub const DEFAULT_RUN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Keyed run storage: by run id and by idempotency key.
#[derive(Clone)]
pub struct RunStore {
    runs: Arc<DashMap<RunId, Run>>,
    by_key: Arc<DashMap<IdempotencyKey, RunId>>,
    ttl: Duration,
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TTL)
    }
}

impl RunStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            runs: Arc::new(DashMap::new()),
            by_key: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Insert a fresh run and index its idempotency key.
    pub fn insert(&self, run: Run) {
        self.by_key.insert(run.idempotency_key.clone(), run.run_id);
        self.runs.insert(run.run_id, run);
    }

    /// Fetch a run, lazily evicting it when its retention has lapsed.
    #[must_use]
    pub fn get(&self, run_id: RunId) -> Option<Run> {
        let expired = {
            let run = self.runs.get(&run_id)?;
            self.is_expired(&run)
        };
        if expired {
            self.evict(run_id);
            return None;
        }
        self.runs.get(&run_id).map(|r| r.clone())
    }

    /// Latest run under an idempotency key, subject to the same lazy
    /// eviction as [`get`](Self::get).
    #[must_use]
    pub fn find_by_key(&self, key: &IdempotencyKey) -> Option<Run> {
        let run_id = *self.by_key.get(key)?;
        self.get(run_id)
    }

    /// Transition a run's status, rejecting regressions, and apply a patch
    /// to the rest of the record under the same lock.
    ///
    /// # Errors
    /// `NotFound` for unknown runs, `IllegalTransition` for regressions.
    pub fn update_status<F>(
        &self,
        run_id: RunId,
        status: RunStatus,
        patch: F,
    ) -> Result<Run, StoreError>
    where
        F: FnOnce(&mut Run),
    {
        let mut entry = self
            .runs
            .get_mut(&run_id)
            .ok_or(StoreError::NotFound(run_id))?;
        if !entry.status.can_transition_to(status) {
            return Err(StoreError::IllegalTransition {
                from: entry.status,
                to: status,
            });
        }
        let now = Utc::now();
        entry.status = status;
        entry.updated_at = now;
        if status == RunStatus::Running {
            entry.started_at = Some(now);
        }
        if status.is_terminal() {
            entry.completed_at = Some(now);
        }
        patch(&mut entry);
        Ok(entry.clone())
    }

    /// Append a progress event and update the current step.
    pub fn record_progress(&self, run_id: RunId, step: Step, detail: &str) {
        if let Some(mut entry) = self.runs.get_mut(&run_id) {
            let now = Utc::now();
            entry.current_step = Some(step);
            entry.updated_at = now;
            entry.progress.push(ProgressEvent {
                at: now,
                step,
                detail: detail.to_string(),
            });
        }
    }

    /// Append a stored evidence handle.
    pub fn record_evidence(&self, run_id: RunId, handle: &str) {
        if let Some(mut entry) = self.runs.get_mut(&run_id) {
            entry.updated_at = Utc::now();
            entry.evidence.push(handle.to_string());
        }
    }

    /// Remove every terminal run past its retention. Returns how many were
    /// swept.
    pub fn sweep(&self) -> usize {
        let expired: Vec<RunId> = self
            .runs
            .iter()
            .filter(|r| self.is_expired(r))
            .map(|r| r.run_id)
            .collect();
        for run_id in &expired {
            self.evict(*run_id);
        }
        if !expired.is_empty() {
            tracing::debug!(swept = expired.len(), "expired runs removed");
        }
        expired.len()
    }

    /// Background sweep task on a fixed interval.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                store.sweep();
            }
        })
    }

    fn is_expired(&self, run: &Run) -> bool {
        let Some(completed_at) = run.completed_at else {
            return false;
        };
        let Ok(ttl) = ChronoDuration::from_std(self.ttl) else {
            return false;
        };
        run.status.is_terminal() && completed_at + ttl < Utc::now()
    }

    fn evict(&self, run_id: RunId) {
        if let Some((_, run)) = self.runs.remove(&run_id) {
            // Only drop the key index if it still points at this run.
            self.by_key
                .remove_if(&run.idempotency_key, |_, id| *id == run_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListingTarget, Manifest};

    fn queued_run() -> Run {
        Run::new(Manifest {
            listing: ListingTarget {
                edit_url: "https://platform.example/listings/42/edit".to_string(),
                listing_id: Some("42".to_string()),
            },
            floorplan_urls: vec!["https://cdn.example.com/a.pdf".to_string()],
            file_urls: vec![],
            tour_url: None,
            deliver_after_attach: false,
            callback: None,
        })
    }

    #[test]
    fn insert_and_lookup_by_key() {
        let store = RunStore::default();
        let run = queued_run();
        let key = run.idempotency_key.clone();
        store.insert(run.clone());

        assert_eq!(store.get(run.run_id).unwrap().run_id, run.run_id);
        assert_eq!(store.find_by_key(&key).unwrap().run_id, run.run_id);
    }

    #[test]
    fn regression_is_rejected() {
        let store = RunStore::default();
        let run = queued_run();
        let run_id = run.run_id;
        store.insert(run);

        store
            .update_status(run_id, RunStatus::Running, |_| {})
            .unwrap();
        let err = store
            .update_status(run_id, RunStatus::Queued, |_| {})
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::IllegalTransition {
                from: RunStatus::Running,
                to: RunStatus::Queued,
            }
        );
    }

    #[test]
    fn terminal_update_stamps_completion() {
        let store = RunStore::default();
        let run = queued_run();
        let run_id = run.run_id;
        store.insert(run);

        store
            .update_status(run_id, RunStatus::Running, |_| {})
            .unwrap();
        let updated = store
            .update_status(run_id, RunStatus::Succeeded, |r| {
                r.actions_performed.saved = true;
            })
            .unwrap();
        assert!(updated.completed_at.is_some());
        assert!(updated.actions_performed.saved);

        // terminal states accept nothing further
        assert!(store
            .update_status(run_id, RunStatus::Failed, |_| {})
            .is_err());
    }

    #[test]
    fn expired_terminal_runs_are_swept() {
        let store = RunStore::new(Duration::from_secs(0));
        let run = queued_run();
        let run_id = run.run_id;
        let key = run.idempotency_key.clone();
        store.insert(run);
        store
            .update_status(run_id, RunStatus::Running, |_| {})
            .unwrap();
        store
            .update_status(run_id, RunStatus::Succeeded, |_| {})
            .unwrap();

        assert_eq!(store.sweep(), 1);
        assert!(store.get(run_id).is_none());
        assert!(store.find_by_key(&key).is_none());
    }

    #[test]
    fn non_terminal_runs_survive_sweep() {
        let store = RunStore::new(Duration::from_secs(0));
        let run = queued_run();
        let run_id = run.run_id;
        store.insert(run);

        assert_eq!(store.sweep(), 0);
        assert!(store.get(run_id).is_some());
    }

    #[test]
    fn progress_and_evidence_accumulate() {
        let store = RunStore::default();
        let run = queued_run();
        let run_id = run.run_id;
        store.insert(run);

        store.record_progress(run_id, Step::Nav, "started");
        store.record_evidence(run_id, "evidence/x/nav-failed.png");

        let run = store.get(run_id).unwrap();
        assert_eq!(run.current_step, Some(Step::Nav));
        assert_eq!(run.progress.len(), 1);
        assert_eq!(run.evidence.len(), 1);
    }
}
