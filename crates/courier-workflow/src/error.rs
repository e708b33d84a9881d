//! Failure taxonomy for the delivery engine.
//!
//! Every failure the run surfaces (over the status endpoint and the signed
//! callback) is a `RunError` with a fixed code, a human-readable message,
//! and a retryability flag.

use courier_session::SessionError;
use courier_ui::UiError;
use serde::{Deserialize, Serialize};

/// Failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Credential artifact unusable; external re-authentication needed
    AuthRequired,
    /// Page navigation failed
    NavigationFailed,
    /// A bounded wait expired while the remote side was still working
    Timeout,
    /// UI confirmed idle and the expected postcondition is absent
    ActionFailed,
    /// Caller error in the submitted manifest
    InvalidManifest,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// Default retryability for the code.
    #[inline]
    #[must_use]
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorCode::AuthRequired | ErrorCode::InvalidManifest => false,
            ErrorCode::NavigationFailed
            | ErrorCode::Timeout
            | ErrorCode::ActionFailed
            | ErrorCode::InternalError => true,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::AuthRequired => "auth_required",
            ErrorCode::NavigationFailed => "navigation_failed",
            ErrorCode::Timeout => "timeout",
            ErrorCode::ActionFailed => "action_failed",
            ErrorCode::InvalidManifest => "invalid_manifest",
            ErrorCode::InternalError => "internal_error",
        };
        write!(f, "{name}")
    }
}

/// Structured terminal error for a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RunError {
    /// Failure classification
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
    /// Whether resubmission may succeed
    pub retryable: bool,
}

impl RunError {
    /// Error with the code's default retryability.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Error with an explicit retryability override (used when error-banner
    /// text is pattern-matched for transience).
    #[must_use]
    pub fn with_retryable(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retryable,
        }
    }
}

impl From<SessionError> for RunError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::AuthRequired { .. } => {
                RunError::new(ErrorCode::AuthRequired, err.to_string())
            }
            SessionError::Backend(_) => RunError::new(ErrorCode::InternalError, err.to_string()),
        }
    }
}

impl From<UiError> for RunError {
    fn from(err: UiError) -> Self {
        let code = match &err {
            UiError::Navigation(_) => ErrorCode::NavigationFailed,
            UiError::Transport(_) | UiError::Protocol(_) => ErrorCode::InternalError,
            UiError::NotFound(_) | UiError::Interaction { .. } => ErrorCode::ActionFailed,
        };
        RunError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_matrix() {
        assert!(!ErrorCode::AuthRequired.is_retryable());
        assert!(!ErrorCode::InvalidManifest.is_retryable());
        assert!(ErrorCode::NavigationFailed.is_retryable());
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(ErrorCode::ActionFailed.is_retryable());
        assert!(ErrorCode::InternalError.is_retryable());
    }

    #[test]
    fn session_auth_maps_to_auth_required() {
        let err: RunError = SessionError::AuthRequired {
            reason: "artifact missing".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::AuthRequired);
        assert!(!err.retryable);
    }

    #[test]
    fn serializes_snake_case() {
        let err = RunError::new(ErrorCode::ActionFailed, "commit never enabled");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "action_failed");
        assert_eq!(json["retryable"], true);
    }
}
