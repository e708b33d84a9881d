//! Single worker: drains the queue, drives the workflow inside a session,
//! records the terminal state, and fires the notifier.

use crate::evidence::EvidenceSink;
use crate::model::{Run, RunId, RunStatus};
use crate::notify::TerminalNotifier;
use crate::queue::WorkReceiver;
use crate::store::RunStore;
use async_trait::async_trait;
use courier_session::SessionManager;
use courier_workflow::{ProgressListener, RunError, Step, WorkflowDriver};
use std::sync::Arc;

/// Bridges workflow progress into the run store and the evidence sink.
struct StoreListener {
    run_id: RunId,
    store: RunStore,
    sink: Arc<dyn EvidenceSink>,
}

#[async_trait]
impl ProgressListener for StoreListener {
    async fn on_progress(&self, step: Step, detail: &str) {
        self.store.record_progress(self.run_id, step, detail);
        self.sink.record_event(self.run_id, step, detail).await;
    }

    async fn on_evidence(&self, label: &str, image_png: &[u8]) {
        match self.sink.record_screenshot(self.run_id, label, image_png).await {
            Ok(handle) => self.store.record_evidence(self.run_id, &handle),
            Err(e) => tracing::warn!(run_id = %self.run_id, error = %e, "evidence write failed"),
        }
    }
}

/// Executes runs one at a time.
pub struct Worker {
    store: RunStore,
    sessions: SessionManager,
    workflow: WorkflowDriver,
    evidence: Arc<dyn EvidenceSink>,
    notifier: Arc<dyn TerminalNotifier>,
}

impl Worker {
    #[must_use]
    pub fn new(
        store: RunStore,
        sessions: SessionManager,
        workflow: WorkflowDriver,
        evidence: Arc<dyn EvidenceSink>,
        notifier: Arc<dyn TerminalNotifier>,
    ) -> Self {
        Self {
            store,
            sessions,
            workflow,
            evidence,
            notifier,
        }
    }

    /// Drain the queue until every producer is gone.
    pub async fn run(self, mut receiver: WorkReceiver) {
        tracing::info!("worker started");
        while let Some(run_id) = receiver.recv().await {
            self.process(run_id).await;
            receiver.complete(run_id);
        }
        tracing::info!("worker stopped");
    }

    async fn process(&self, run_id: RunId) {
        let Some(run) = self.store.get(run_id) else {
            tracing::warn!(%run_id, "queued run no longer in store");
            return;
        };
        if run.status.is_terminal() {
            tracing::debug!(%run_id, status = %run.status, "already terminal, skipping");
            return;
        }
        if run.status == RunStatus::Queued {
            if let Err(e) = self.store.update_status(run_id, RunStatus::Running, |_| {}) {
                tracing::warn!(%run_id, error = %e, "could not mark run running");
                return;
            }
        } else {
            // A reaped lease re-delivered a Running run; restart from the
            // top of the workflow.
            tracing::warn!(%run_id, "restarting stalled run");
        }
        tracing::info!(%run_id, "run started");

        let plan = run.manifest.plan();
        let listener = StoreListener {
            run_id,
            store: self.store.clone(),
            sink: self.evidence.clone(),
        };

        let guard = match self.sessions.open().await {
            Ok(guard) => guard,
            Err(session_err) => {
                let error = RunError::from(session_err);
                self.finish(run_id, RunStatus::Failed, |r| {
                    r.error = Some(error);
                })
                .await;
                return;
            }
        };

        // execute() never panics and always yields a report, so the session
        // is released on every path.
        let report = self
            .workflow
            .execute(guard.driver(), &plan, &listener)
            .await;
        guard.close().await;

        let status = if report.succeeded() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };
        self.finish(run_id, status, |r| {
            r.actions_performed = report.actions;
            r.floorplans = report.floorplans;
            r.files = report.files;
            r.error = report.error;
            if let Some(step) = report.failed_step {
                r.current_step = Some(step);
            }
        })
        .await;
    }

    async fn finish<F>(&self, run_id: RunId, status: RunStatus, patch: F)
    where
        F: FnOnce(&mut Run),
    {
        match self.store.update_status(run_id, status, patch) {
            Ok(run) => {
                tracing::info!(%run_id, status = %status, "run finished");
                self.notifier.notify(&run).await;
            }
            Err(e) => tracing::warn!(%run_id, error = %e, "terminal update rejected"),
        }
    }
}
