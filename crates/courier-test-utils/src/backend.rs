//! Fake session backend over the scripted browser.

use crate::browser::{Behavior, FakeBrowser};
use async_trait::async_trait;
use courier_session::{SessionBackend, SessionConfig, SessionError, StorageState};
use courier_ui::UiDriver;
use parking_lot::Mutex;

/// Launches [`FakeBrowser`] pages and keeps a handle to each one so tests
/// can inspect what the engine did to them.
pub struct FakeBackend {
    behavior: Behavior,
    fail_launch: Option<String>,
    launched: Mutex<Vec<FakeBrowser>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new(Behavior::default())
    }
}

impl FakeBackend {
    #[must_use]
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            fail_launch: None,
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Backend whose every launch fails at the transport.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::default(),
            fail_launch: Some(message.into()),
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Handles to every page launched so far.
    #[must_use]
    pub fn launched(&self) -> Vec<FakeBrowser> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn launch(
        &self,
        _state: &StorageState,
        _config: &SessionConfig,
    ) -> Result<Box<dyn UiDriver>, SessionError> {
        if let Some(message) = &self.fail_launch {
            return Err(SessionError::Backend(message.clone()));
        }
        let browser = FakeBrowser::new(self.behavior.clone());
        self.launched.lock().push(browser.clone());
        Ok(Box::new(browser))
    }
}
