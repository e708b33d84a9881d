//! Courier API - the HTTP surface over the run orchestrator
//!
//! - `POST /deliver`, `GET /status/{run_id}`, `GET /healthz`
//! - bearer-token auth with constant-time comparison
//! - HMAC-signed terminal-state callbacks
//! - layered TOML + env configuration for the `courier-server` binary

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod signature;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::ApiError;
pub use notifier::HttpCallbackNotifier;
pub use routes::router;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
