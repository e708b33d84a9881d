//! 3D tour attachment: a small multi-field form whose widget is known to
//! clear fields asynchronously, so every field is re-checked immediately
//! before commit.

use crate::driver::StepContext;
use crate::import::fill_verified;
use crate::step::Step;
use courier_ui::{Backoff, UiError};
use tokio::time::{sleep, Instant};

/// Title given to the attached tour; also the verification handle.
pub const TOUR_TITLE: &str = "3D Tour";

/// Display type selected for the tour widget.
pub const TOUR_DISPLAY_TYPE: &str = "floorplan";

/// How a tour attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TourOutcome {
    /// Tour row verified present
    Added,
    /// Tour already attached; nothing done
    Skipped,
    /// Attempt failed with a reason; caller decides whether to retry
    Failed(String),
}

/// Attach the 3D tour, retrying within the attempt budget. The preflight
/// check runs before every attempt so a retry never adds a second tour.
pub(crate) async fn add_tour(
    ctx: &StepContext<'_>,
    tour_url: &str,
    baseline_rows: usize,
) -> Result<TourOutcome, UiError> {
    let mut last_reason = String::new();

    for attempt in 1..=ctx.config.attempt_budget {
        if attempt > 1 {
            sleep(ctx.config.attempt_delay).await;
        }

        if tour_present(ctx, baseline_rows).await? {
            return Ok(if attempt == 1 {
                TourOutcome::Skipped
            } else {
                // An earlier attempt committed even though verification
                // missed it at the time.
                TourOutcome::Added
            });
        }

        match run_attempt(ctx, tour_url, baseline_rows).await {
            Ok(None) => return Ok(TourOutcome::Added),
            Ok(Some(reason)) => {
                tracing::warn!(attempt, reason = %reason, "tour attempt failed");
                ctx.capture(&format!("{}-attempt{attempt}", Step::Add3d)).await;
                last_reason = reason;
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(attempt, error = %err, "tour attempt hit transient error");
                last_reason = err.to_string();
            }
            Err(err) => return Err(err),
        }
    }

    Ok(TourOutcome::Failed(last_reason))
}

/// One pass: open form, fill all fields, re-validate, commit, verify.
/// Returns `Ok(None)` on verified success, `Ok(Some(reason))` otherwise.
async fn run_attempt(
    ctx: &StepContext<'_>,
    tour_url: &str,
    baseline_rows: usize,
) -> Result<Option<String>, UiError> {
    let tour = &ctx.page.tour;

    ctx.driver.click(&tour.add_button).await?;
    if !ctx
        .observer
        .wait_present(ctx.driver, &tour.url_input, ctx.config.element_timeout)
        .await?
    {
        return Ok(Some("tour form did not open".to_string()));
    }

    let fields = [
        (&tour.url_input, tour_url),
        (&tour.title_input, TOUR_TITLE),
        (&tour.display_type_input, TOUR_DISPLAY_TYPE),
    ];

    for (locator, value) in fields {
        if !fill_verified(ctx, locator, value).await? {
            return Ok(Some(format!("tour field {locator} read-back mismatch")));
        }
    }

    // The widget clears fields asynchronously; re-read each one right
    // before commit and re-apply anything that was reset.
    for (locator, value) in fields {
        if ctx.driver.read_value(locator).await? != value {
            tracing::debug!(field = %locator, "tour field was reset, re-applying");
            if !fill_verified(ctx, locator, value).await? {
                return Ok(Some(format!("tour field {locator} lost its value")));
            }
        }
    }

    ctx.driver.click(&tour.commit_button).await?;
    ctx.observer
        .wait_idle(ctx.driver, ctx.config.element_timeout)
        .await?;

    if verify_tour(ctx, baseline_rows).await? {
        Ok(None)
    } else {
        Ok(Some("tour row absent after commit".to_string()))
    }
}

/// Presence probe: a row carrying the tour title, or more committed rows
/// than the baseline count.
async fn tour_present(ctx: &StepContext<'_>, baseline_rows: usize) -> Result<bool, UiError> {
    if ctx
        .driver
        .exists(&ctx.page.tour_titled(TOUR_TITLE))
        .await?
    {
        return Ok(true);
    }
    Ok(ctx.driver.count(&ctx.page.tour.rows).await? > baseline_rows)
}

/// Bounded backoff poll for the committed tour row.
async fn verify_tour(ctx: &StepContext<'_>, baseline_rows: usize) -> Result<bool, UiError> {
    let deadline = Instant::now() + ctx.config.verify_timeout;
    let mut backoff = Backoff::verification();
    loop {
        if tour_present(ctx, baseline_rows).await? {
            return Ok(true);
        }
        let delay = backoff.next_delay();
        if Instant::now() + delay > deadline {
            return Ok(false);
        }
        sleep(delay).await;
    }
}
