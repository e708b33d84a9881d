//! Terminal-state notification seam.
//!
//! The signed HTTP callback lives in the server crate; this trait keeps the
//! worker independent of the transport.

use crate::model::Run;
use async_trait::async_trait;

/// Notified exactly once per run, when it reaches a terminal status.
///
/// Implementations must swallow their own failures; notification never
/// affects run state.
#[async_trait]
pub trait TerminalNotifier: Send + Sync {
    async fn notify(&self, run: &Run);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl TerminalNotifier for NullNotifier {
    async fn notify(&self, _run: &Run) {}
}
