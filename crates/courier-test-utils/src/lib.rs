//! Testing utilities for the courier workspace
//!
//! A scripted in-memory stand-in for the remote listing editor, a fake
//! session backend over it, and credential artifact fixtures.

#![allow(missing_docs)]

pub mod backend;
pub mod browser;
pub mod fixtures;

pub use backend::FakeBackend;
pub use browser::{BannerScript, Behavior, FakeBrowser};
pub use fixtures::{expired_storage_state, fresh_storage_state, write_artifact};
