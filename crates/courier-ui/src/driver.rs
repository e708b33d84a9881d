//! Driver trait and locator model.
//!
//! The driver is the only seam that touches the remote session. Its contract
//! deliberately avoids exceptions-as-control-flow: probes for elements that
//! may legitimately be absent (`exists`, `is_visible`, `text`, ...) return
//! `Ok` with a negative value, and only interactions that were expected to
//! succeed (`click`, `fill`, `read_value`) surface `UiError`.

use crate::observer::SignalMap;
use crate::snapshot::UiSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors at the remote UI boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UiError {
    /// No locator candidate resolved to an element
    #[error("element not found: {0}")]
    NotFound(String),

    /// An interaction on a resolved element failed
    #[error("interaction failed on {locator}: {message}")]
    Interaction {
        /// Locator label
        locator: String,
        /// Driver-reported failure
        message: String,
    },

    /// Page navigation or reload failed
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Transport-level failure talking to the remote session
    #[error("session transport error: {0}")]
    Transport(String),

    /// The remote endpoint answered with something unintelligible
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl UiError {
    /// Transport and navigation failures are transient; a retry of the
    /// enclosing step may succeed.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Navigation(_) | Self::Transport(_))
    }
}

/// An ordered list of candidate selectors.
///
/// Target UIs rarely expose one stable hook, so each logical element carries
/// several selector strategies; drivers try candidates in priority order and
/// use the first that resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Human-readable label used in logs and errors
    pub label: String,
    /// Candidate selectors, highest priority first
    pub candidates: Vec<String>,
}

impl Locator {
    /// Single-candidate locator.
    #[must_use]
    pub fn css(label: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            candidates: vec![selector.into()],
        }
    }

    /// Multi-candidate locator, highest priority first.
    #[must_use]
    pub fn any_of<I, S>(label: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Async driver over one remote page.
///
/// Implementations own the transport (WebDriver endpoint, scripted fake);
/// callers own all timing: no method on this trait blocks beyond a single
/// round trip.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate to an absolute URL.
    async fn goto(&self, url: &str) -> Result<(), UiError>;

    /// Reload the current page.
    async fn reload(&self) -> Result<(), UiError>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String, UiError>;

    /// Click the first resolving candidate.
    async fn click(&self, locator: &Locator) -> Result<(), UiError>;

    /// Replace the element value in one shot.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), UiError>;

    /// Clear and re-type character by character; used as the slow path when
    /// a plain `fill` read back a mismatched value.
    async fn type_slow(&self, locator: &Locator, value: &str) -> Result<(), UiError>;

    /// Read back the current input value.
    async fn read_value(&self, locator: &Locator) -> Result<String, UiError>;

    /// Inner text of the element, `None` when it does not resolve.
    async fn text(&self, locator: &Locator) -> Result<Option<String>, UiError>;

    /// Attribute value, `None` when element or attribute is absent.
    async fn attr(&self, locator: &Locator, name: &str) -> Result<Option<String>, UiError>;

    /// Number of elements matching the first resolving candidate.
    async fn count(&self, locator: &Locator) -> Result<usize, UiError>;

    /// Whether any candidate resolves.
    async fn exists(&self, locator: &Locator) -> Result<bool, UiError> {
        Ok(self.count(locator).await? > 0)
    }

    /// Whether the element resolves and is displayed.
    async fn is_visible(&self, locator: &Locator) -> Result<bool, UiError>;

    /// Whether the element resolves and is enabled.
    async fn is_enabled(&self, locator: &Locator) -> Result<bool, UiError>;

    /// Current checked state; `false` when the element does not resolve.
    async fn is_checked(&self, locator: &Locator) -> Result<bool, UiError>;

    /// Set a checkbox/toggle to the requested state.
    async fn set_checked(&self, locator: &Locator, on: bool) -> Result<(), UiError>;

    /// Whether the page body contains the needle (substring match).
    async fn page_contains(&self, needle: &str) -> Result<bool, UiError>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, UiError>;

    /// Release the remote page/session.
    async fn close(&self) -> Result<(), UiError>;

    /// Read every observable signal once and reduce to a snapshot.
    ///
    /// The default implementation composes the primitive probes; scripted
    /// drivers may override it to advance an internal timeline exactly once
    /// per poll.
    async fn poll_signals(&self, signals: &SignalMap) -> Result<UiSnapshot, UiError> {
        let progress_active = self.exists(&signals.progress_bar).await?;
        let progress_percent = if progress_active {
            self.attr(&signals.progress_bar, &signals.progress_percent_attr)
                .await?
                .and_then(|raw| raw.trim().parse::<u8>().ok())
        } else {
            None
        };
        let has_skeleton_loader = self.exists(&signals.skeleton).await?;
        let has_modal_spinner = self.exists(&signals.modal_spinner).await?;
        let has_staged_item = self.exists(&signals.staged_item).await?;
        let has_real_filename = if has_staged_item {
            match self.text(&signals.staged_item_name).await? {
                Some(name) => signals.is_real_filename(&name),
                None => false,
            }
        } else {
            false
        };
        let commit_visible = self.is_visible(&signals.commit_button).await?;
        let commit_enabled = commit_visible && self.is_enabled(&signals.commit_button).await?;
        let has_error_banner = self.exists(&signals.error_banner).await?;
        let error_text = if has_error_banner {
            self.text(&signals.error_banner).await?
        } else {
            None
        };

        Ok(UiSnapshot {
            progress_active,
            progress_percent,
            has_skeleton_loader,
            has_modal_spinner,
            has_staged_item,
            has_real_filename,
            commit_enabled,
            commit_visible,
            has_error_banner,
            error_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_candidates_keep_priority_order() {
        let locator = Locator::any_of("commit", ["#commit", "button[type=submit]"]);
        assert_eq!(locator.candidates[0], "#commit");
        assert_eq!(locator.to_string(), "commit");
    }

    #[test]
    fn transient_classification() {
        assert!(UiError::Navigation("lost".into()).is_transient());
        assert!(UiError::Transport("reset".into()).is_transient());
        assert!(!UiError::NotFound("x".into()).is_transient());
    }
}
