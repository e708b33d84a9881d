//! Courier Workflow - the delivery automation state machine
//!
//! Drives a remote interactive session through the ordered step sequence
//! navigate → capture baseline → import floor plans → import files → add 3D
//! content → save → (optional) deliver, using:
//! - verification-based progress detection instead of fixed delays
//! - idempotent skip-if-already-present preflight checks
//! - bounded retries with failure classification
//!
//! Nothing in this crate waits without an explicit upper bound, and no
//! action is considered performed until an independent postcondition check
//! has confirmed its effect.

#![warn(unreachable_pub)]

pub mod config;
pub mod driver;
pub mod error;
pub mod finalize;
pub mod import;
pub mod plan;
pub mod progress;
pub mod selectors;
pub mod step;
pub mod tour;

pub use config::WorkflowConfig;
pub use driver::WorkflowDriver;
pub use error::{ErrorCode, RunError};
pub use plan::{ActionsPerformed, AssetOutcome, BatchReport, DeliveryPlan, WorkflowReport};
pub use progress::{NullListener, ProgressListener};
pub use selectors::PageMap;
pub use step::Step;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
