//! Courier Run - run lifecycle around the workflow engine
//!
//! Owns everything between "a manifest arrived" and "a terminal status is
//! observable":
//! - the `Run` record and its monotonic status machine
//! - idempotent submission keyed by listing identity
//! - the in-memory run store with TTL retention
//! - the single-worker queue that executes runs one at a time
//! - evidence reporting and terminal-state notification seams

#![warn(unreachable_pub)]

pub mod evidence;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod worker;

pub use evidence::{EvidenceError, EvidenceSink, FsEvidenceSink, NullEvidenceSink};
pub use model::{
    CallbackTarget, IdempotencyKey, ListingTarget, Manifest, ProgressEvent, Run, RunId, RunStatus,
};
pub use notify::{NullNotifier, TerminalNotifier};
pub use orchestrator::{Orchestrator, SubmitError, SubmitOutcome};
pub use queue::{work_queue, QueueError, WorkQueue, WorkReceiver};
pub use store::{RunStore, StoreError, DEFAULT_RUN_TTL};
pub use worker::Worker;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
