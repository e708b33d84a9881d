//! Single-consumer work queue with run-id deduplication and a stalled-job
//! lease.

use crate::model::RunId;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Default capacity of the pending channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default lease before a run is considered stalled and re-enqueued.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30 * 60);

/// Producer half. Enqueueing the same run id twice while the first unit is
/// still in flight is a no-op.
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<RunId>,
    inflight: Arc<DashMap<RunId, Instant>>,
    lease: Duration,
}

/// Consumer half, held by the single worker.
pub struct WorkReceiver {
    rx: mpsc::Receiver<RunId>,
    inflight: Arc<DashMap<RunId, Instant>>,
}

/// Build a connected queue pair.
#[must_use]
pub fn work_queue(capacity: usize, lease: Duration) -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let inflight = Arc::new(DashMap::new());
    (
        WorkQueue {
            tx,
            inflight: inflight.clone(),
            lease,
        },
        WorkReceiver { rx, inflight },
    )
}

impl WorkQueue {
    /// Enqueue one unit. Returns false when the run is already pending or
    /// executing.
    ///
    /// # Errors
    /// `QueueClosed` when the channel is full or the worker is gone.
    pub fn enqueue(&self, run_id: RunId) -> Result<bool, QueueError> {
        if self.inflight.contains_key(&run_id) {
            tracing::debug!(%run_id, "already in flight, not re-enqueued");
            return Ok(false);
        }
        self.inflight.insert(run_id, Instant::now());
        if self.tx.try_send(run_id).is_err() {
            self.inflight.remove(&run_id);
            return Err(QueueError::QueueClosed);
        }
        Ok(true)
    }

    /// Re-enqueue every unit whose lease has expired. The worker restarts
    /// these from the top of the workflow; there is no mid-step resume.
    pub fn reap_stalled(&self) -> usize {
        let now = Instant::now();
        let stalled: Vec<RunId> = self
            .inflight
            .iter()
            .filter(|e| now.duration_since(*e.value()) > self.lease)
            .map(|e| *e.key())
            .collect();
        let mut reaped = 0;
        for run_id in stalled {
            tracing::warn!(%run_id, "lease expired, re-enqueueing");
            self.inflight.insert(run_id, now);
            if self.tx.try_send(run_id).is_ok() {
                reaped += 1;
            }
        }
        reaped
    }

    /// Background reaper on a fixed interval.
    pub fn spawn_reaper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                queue.reap_stalled();
            }
        })
    }
}

/// Queue submission error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Channel full or worker gone
    #[error("work queue unavailable")]
    QueueClosed,
}

impl WorkReceiver {
    /// Next unit, or `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<RunId> {
        self.rx.recv().await
    }

    /// Non-blocking receive; `None` when the channel is currently empty.
    pub fn try_recv(&mut self) -> Option<RunId> {
        self.rx.try_recv().ok()
    }

    /// Mark a unit finished, releasing its lease.
    pub fn complete(&self, run_id: RunId) {
        self.inflight.remove(&run_id);
    }
}
