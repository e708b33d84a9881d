//! Shared request-handling state, built once at startup and passed down
//! explicitly.

use courier_run::Orchestrator;

/// Everything the route handlers need.
pub struct AppContext {
    pub orchestrator: Orchestrator,
    /// Expected bearer token for the run routes
    pub auth_token: String,
}

impl AppContext {
    #[must_use]
    pub fn new(orchestrator: Orchestrator, auth_token: impl Into<String>) -> Self {
        Self {
            orchestrator,
            auth_token: auth_token.into(),
        }
    }
}
