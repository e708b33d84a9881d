//! Session manager: acquire, hand out, and always release the remote
//! session.

use crate::artifact::StorageState;
use crate::backend::{SessionBackend, SessionConfig};
use courier_ui::UiDriver;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Session acquisition and lifecycle errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The credential artifact is absent, unreadable, or stale; external
    /// re-authentication is needed. Non-retryable.
    #[error("authentication required: {reason}")]
    AuthRequired {
        /// What made the artifact unusable
        reason: String,
    },

    /// The transport failed to produce a session
    #[error("session backend failed: {0}")]
    Backend(String),
}

/// Owns a live driver for the duration of one workflow run.
///
/// The guard is consumed by [`SessionGuard::close`]; dropping it without
/// closing logs a leak warning (async teardown cannot run in `Drop`), so
/// callers must close on every exit path.
pub struct SessionGuard {
    driver: Option<Box<dyn UiDriver>>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("live", &self.driver.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    /// Access the driver.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &dyn UiDriver {
        match &self.driver {
            Some(driver) => driver.as_ref(),
            // close() consumes the guard, so a live guard always holds one
            None => unreachable!("session guard without driver"),
        }
    }

    /// Release the remote session. Transport failures during teardown are
    /// logged, not surfaced; the session is gone either way.
    pub async fn close(mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "session teardown reported an error");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.driver.is_some() {
            tracing::warn!("session guard dropped without close(); remote session may leak");
        }
    }
}

/// Acquires authenticated sessions from the persisted credential artifact.
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
    artifact_path: PathBuf,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager over a backend and artifact path.
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        artifact_path: impl AsRef<Path>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            artifact_path: artifact_path.as_ref().to_path_buf(),
            config,
        }
    }

    /// Load and validate the artifact, then launch a session.
    ///
    /// # Errors
    /// `AuthRequired` for artifact problems, `Backend` for transport ones.
    pub async fn open(&self) -> Result<SessionGuard, SessionError> {
        let state = StorageState::load(&self.artifact_path)?;
        tracing::info!(
            cookies = state.live_cookies().len(),
            "opening authenticated session"
        );
        let driver = self.backend.launch(&state, &self.config).await?;
        Ok(SessionGuard {
            driver: Some(driver),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Cookie, StorageState};
    use crate::backend::{SessionBackend, SessionConfig};
    use async_trait::async_trait;
    use courier_ui::{Locator, UiError};
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NoopDriver {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl UiDriver for NoopDriver {
        async fn goto(&self, _url: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn reload(&self) -> Result<(), UiError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, UiError> {
            Ok(String::new())
        }
        async fn click(&self, _l: &Locator) -> Result<(), UiError> {
            Ok(())
        }
        async fn fill(&self, _l: &Locator, _v: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn type_slow(&self, _l: &Locator, _v: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn read_value(&self, _l: &Locator) -> Result<String, UiError> {
            Ok(String::new())
        }
        async fn text(&self, _l: &Locator) -> Result<Option<String>, UiError> {
            Ok(None)
        }
        async fn attr(&self, _l: &Locator, _n: &str) -> Result<Option<String>, UiError> {
            Ok(None)
        }
        async fn count(&self, _l: &Locator) -> Result<usize, UiError> {
            Ok(0)
        }
        async fn is_visible(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn is_enabled(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn is_checked(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn set_checked(&self, _l: &Locator, _on: bool) -> Result<(), UiError> {
            Ok(())
        }
        async fn page_contains(&self, _needle: &str) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn screenshot(&self) -> Result<Vec<u8>, UiError> {
            Ok(Vec::new())
        }
        async fn close(&self) -> Result<(), UiError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoopBackend {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SessionBackend for NoopBackend {
        async fn launch(
            &self,
            _state: &StorageState,
            _config: &SessionConfig,
        ) -> Result<Box<dyn UiDriver>, SessionError> {
            Ok(Box::new(NoopDriver {
                closed: self.closed.clone(),
            }))
        }
    }

    fn artifact_file() -> tempfile::NamedTempFile {
        let state = StorageState {
            cookies: vec![Cookie {
                name: "sid".into(),
                value: "abc".into(),
                domain: ".platform.example".into(),
                path: "/".into(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: "Lax".into(),
            }],
            origins: vec![],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&state).unwrap()).unwrap();
        file
    }

    fn manager(closed: Arc<AtomicBool>, path: &std::path::Path) -> SessionManager {
        SessionManager::new(
            Arc::new(NoopBackend { closed }),
            path,
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn missing_artifact_fails_before_backend_launch() {
        let closed = Arc::new(AtomicBool::new(false));
        let mgr = manager(closed, std::path::Path::new("/nonexistent/state.json"));
        let err = mgr.open().await.unwrap_err();
        assert!(matches!(err, SessionError::AuthRequired { .. }));
    }

    #[tokio::test]
    async fn guard_releases_session_on_close() {
        let closed = Arc::new(AtomicBool::new(false));
        let file = artifact_file();
        let mgr = manager(closed.clone(), file.path());

        let guard = mgr.open().await.unwrap();
        guard.driver().goto("https://platform.example").await.unwrap();
        assert!(!closed.load(Ordering::SeqCst));

        guard.close().await;
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn open_surfaces_backend_failures() {
        struct FailingBackend;

        #[async_trait]
        impl SessionBackend for FailingBackend {
            async fn launch(
                &self,
                _state: &StorageState,
                _config: &SessionConfig,
            ) -> Result<Box<dyn UiDriver>, SessionError> {
                Err(SessionError::Backend("no browser available".into()))
            }
        }

        let file = artifact_file();
        let mgr = SessionManager::new(
            Arc::new(FailingBackend),
            file.path(),
            SessionConfig::default(),
        );
        let err = mgr.open().await.unwrap_err();
        assert!(matches!(err, SessionError::Backend(_)));
    }
}
