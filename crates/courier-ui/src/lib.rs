//! Courier UI - the remote UI boundary
//!
//! Everything the automation engine knows about the target web surface goes
//! through this crate:
//! - `UiDriver`: the driver trait, returning structured outcomes instead of
//!   exception-style control flow
//! - `Locator`: ordered candidate selectors tried in priority order
//! - `UiSnapshot`: the fixed set of observable signals reduced to a small
//!   discrete value
//! - `Observer`: polling with debounced readiness and bounded waits
//!
//! Every wait in this crate carries an explicit upper bound.

#![warn(unreachable_pub)]

pub mod driver;
pub mod observer;
pub mod snapshot;
pub mod wait;

pub use driver::{Locator, UiDriver, UiError};
pub use observer::{IdleOutcome, Observer, ReadyOutcome, SignalMap};
pub use snapshot::UiSnapshot;
pub use wait::Backoff;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
