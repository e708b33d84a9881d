//! Discrete snapshot of the observable UI signals.

use serde::{Deserialize, Serialize};

/// One poll of the remote page reduced to the fixed signal set.
///
/// Ephemeral: recomputed per poll and never persisted past the decision
/// that consumed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSnapshot {
    /// A progress indicator is present
    pub progress_active: bool,
    /// Reported completion percentage, when the indicator exposes one
    pub progress_percent: Option<u8>,
    /// A skeleton loader is rendered
    pub has_skeleton_loader: bool,
    /// A modal spinner is rendered
    pub has_modal_spinner: bool,
    /// A staged (not yet committed) item row is present
    pub has_staged_item: bool,
    /// The staged item has resolved to a real filename
    pub has_real_filename: bool,
    /// The commit control is enabled
    pub commit_enabled: bool,
    /// The commit control is visible
    pub commit_visible: bool,
    /// An error banner is shown
    pub has_error_banner: bool,
    /// Error banner text, when present
    pub error_text: Option<String>,
}

impl UiSnapshot {
    /// Whether any loading signal is still active: progress below
    /// completion, skeleton or spinner, a staged item that has not resolved
    /// to a real filename, or a commit control that is visible but disabled.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        if self.progress_active && !self.progress_complete() {
            return true;
        }
        if self.has_skeleton_loader || self.has_modal_spinner {
            return true;
        }
        if self.has_staged_item && !self.has_real_filename {
            return true;
        }
        self.commit_visible && !self.commit_enabled
    }

    /// Whether the page is safe to commit: no error banner, no active
    /// progress below completion, no skeleton/spinner, staged item (if any)
    /// resolved to a real filename, commit control visible and enabled.
    #[must_use]
    pub fn ready_for_commit(&self) -> bool {
        if self.has_error_banner {
            return false;
        }
        if self.progress_active && !self.progress_complete() {
            return false;
        }
        if self.has_skeleton_loader || self.has_modal_spinner {
            return false;
        }
        if self.has_staged_item && !self.has_real_filename {
            return false;
        }
        self.commit_visible && self.commit_enabled
    }

    /// A progress indicator without a readable percentage is treated as
    /// below completion.
    fn progress_complete(&self) -> bool {
        matches!(self.progress_percent, Some(p) if p >= 100)
    }
}
