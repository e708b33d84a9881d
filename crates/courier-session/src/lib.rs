//! Courier Session - authenticated remote session lifecycle
//!
//! Turns a persisted credential artifact (cookie list produced by the
//! external login collaborator) into an authenticated remote session:
//! - Artifact parsing and freshness validation
//! - `SessionBackend` seam for the concrete browser transport
//! - `SessionManager` with a scoped-resource teardown guarantee
//! - `WebDriverBackend`: W3C WebDriver transport over HTTP

#![warn(unreachable_pub)]

pub mod artifact;
pub mod backend;
pub mod manager;
pub mod webdriver;

pub use artifact::{Cookie, StorageState};
pub use backend::{SessionBackend, SessionConfig};
pub use manager::{SessionError, SessionGuard, SessionManager};
pub use webdriver::WebDriverBackend;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
