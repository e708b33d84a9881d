//! Transport seam: how a validated credential artifact becomes a live
//! driver.

use crate::artifact::StorageState;
use crate::manager::SessionError;
use async_trait::async_trait;
use courier_ui::UiDriver;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeouts applied to every session operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Per-operation default timeout
    pub default_timeout: Duration,
    /// Page navigation timeout
    pub navigation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

/// Creates authenticated drivers from persisted credentials.
///
/// The concrete browser transport lives behind this trait; the engine only
/// ever sees a boxed [`UiDriver`].
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Launch a remote session, inject the persisted cookies, and apply the
    /// configured timeouts.
    async fn launch(
        &self,
        state: &StorageState,
        config: &SessionConfig,
    ) -> Result<Box<dyn UiDriver>, SessionError>;
}
