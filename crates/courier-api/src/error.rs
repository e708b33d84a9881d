//! API error type mapped onto HTTP status codes with a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use courier_run::SubmitError;
use serde_json::json;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or wrong bearer token
    #[error("missing or invalid authorization")]
    Unauthorized,

    /// Unknown run id
    #[error("run not found")]
    NotFound,

    /// Manifest failed validation
    #[error("invalid manifest: {0}")]
    Invalid(String),

    /// Work queue is full
    #[error("queue is saturated, retry later")]
    Saturated,

    /// Anything unexpected
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Saturated => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidManifest(reason) => Self::Invalid(reason),
            SubmitError::Saturated => Self::Saturated,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_map_to_statuses() {
        let invalid: ApiError = SubmitError::InvalidManifest("edit_url missing".into()).into();
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let saturated: ApiError = SubmitError::Saturated.into();
        assert_eq!(saturated.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unauthorized_is_401() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
