//! Save and deliver: fire a page-level action and classify the outcome
//! from the banners that follow.

use crate::driver::StepContext;
use crate::step::Step;
use courier_ui::{Locator, UiError};
use tokio::time::{sleep, Instant};

/// Error texts that indicate a transient platform condition rather than a
/// rejected action.
const TRANSIENT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "navigation",
    "connection",
    "gateway",
    "temporarily",
    "try again",
];

/// How a page-level action concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfirmOutcome {
    /// Success banner observed
    Confirmed,
    /// No banner either way inside the window; treated as success with a
    /// warning, since the platform frequently skips the banner
    Inconclusive,
    /// Error banner with transient wording; worth retrying
    TransientError(String),
    /// Error banner rejecting the action
    Rejected(String),
}

impl ConfirmOutcome {
    pub(crate) fn succeeded(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed | ConfirmOutcome::Inconclusive)
    }
}

/// Click a page-level action button, wait for the UI to settle, then watch
/// the banner area for the configured window.
pub(crate) async fn click_and_confirm(
    ctx: &StepContext<'_>,
    step: Step,
    button: &Locator,
) -> Result<ConfirmOutcome, UiError> {
    ctx.driver.click(button).await?;
    ctx.observer
        .wait_idle(ctx.driver, ctx.config.element_timeout)
        .await?;

    let deadline = Instant::now() + ctx.config.banner_timeout;
    loop {
        if ctx.driver.exists(&ctx.page.success_banner).await? {
            tracing::info!(step = %step, "success banner observed");
            return Ok(ConfirmOutcome::Confirmed);
        }

        let snapshot = ctx.observer.snapshot(ctx.driver).await?;
        if snapshot.has_error_banner {
            let text = snapshot.error_text.unwrap_or_default();
            ctx.capture(&format!("{step}-error-banner")).await;
            return Ok(if is_transient_text(&text) {
                ConfirmOutcome::TransientError(text)
            } else {
                ConfirmOutcome::Rejected(text)
            });
        }

        if Instant::now() + ctx.config.poll_interval > deadline {
            tracing::warn!(step = %step, "no banner inside the window, assuming success");
            return Ok(ConfirmOutcome::Inconclusive);
        }
        sleep(ctx.config.poll_interval).await;
    }
}

/// Run the action with the step's attempt budget; only transient errors
/// consume further attempts.
pub(crate) async fn run_action(
    ctx: &StepContext<'_>,
    step: Step,
    button: &Locator,
) -> Result<ConfirmOutcome, UiError> {
    let mut last = ConfirmOutcome::Inconclusive;

    for attempt in 1..=ctx.config.attempt_budget {
        if attempt > 1 {
            sleep(ctx.config.attempt_delay).await;
        }

        last = match click_and_confirm(ctx, step, button).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_transient() => {
                tracing::warn!(step = %step, attempt, error = %err, "action hit transient error");
                ConfirmOutcome::TransientError(err.to_string())
            }
            Err(err) => return Err(err),
        };

        match &last {
            ConfirmOutcome::Confirmed | ConfirmOutcome::Inconclusive => return Ok(last),
            ConfirmOutcome::Rejected(_) => return Ok(last),
            ConfirmOutcome::TransientError(reason) => {
                tracing::warn!(step = %step, attempt, reason = %reason, "retrying action");
            }
        }
    }

    Ok(last)
}

fn is_transient_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    TRANSIENT_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
