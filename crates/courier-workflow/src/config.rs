//! Workflow timing and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budgets and wait bounds for one run.
///
/// Remote import processing can be slow, so the readiness and verification
/// windows default generously; everything else is tight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Attempts per step / per asset before the run fails
    pub attempt_budget: u32,
    /// Fixed delay between attempts
    pub attempt_delay: Duration,
    /// Upper bound on the debounced readiness wait after triggering import
    pub readiness_timeout: Duration,
    /// Upper bound on postcondition verification (per pass)
    pub verify_timeout: Duration,
    /// Upper bound on the commit modal closing
    pub modal_timeout: Duration,
    /// Window to observe a success/error banner after save/deliver
    pub banner_timeout: Duration,
    /// Upper bound for elements expected to appear promptly (dialogs,
    /// inputs)
    pub element_timeout: Duration,
    /// Observer poll tick
    pub poll_interval: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            attempt_budget: 3,
            attempt_delay: Duration::from_secs(2),
            readiness_timeout: Duration::from_secs(120),
            verify_timeout: Duration::from_secs(30),
            modal_timeout: Duration::from_secs(10),
            banner_timeout: Duration::from_secs(15),
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WorkflowConfig {
    /// Fast variant for scripted-driver tests.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            attempt_budget: 3,
            attempt_delay: Duration::from_millis(1),
            readiness_timeout: Duration::from_millis(200),
            verify_timeout: Duration::from_millis(100),
            modal_timeout: Duration::from_millis(50),
            banner_timeout: Duration::from_millis(50),
            element_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
        }
    }
}
