//! The import sub-protocol: attach one externally hosted asset via the
//! "add via link" affordance, with preflight skip, read-back verified
//! input, debounced readiness, and postcondition verification.

use crate::driver::StepContext;
use crate::plan::{AssetOutcome, AssetReport, BatchReport};
use crate::selectors::SectionMap;
use crate::step::Step;
use courier_assets::{dedupe, BatchTag, NormalizedAsset};
use courier_ui::{Backoff, Locator, ReadyOutcome, UiError};
use tokio::time::{sleep, Instant};

/// How one attempt ended.
enum Attempt {
    /// Postcondition verified
    Verified,
    /// Attempt failed; another attempt may succeed
    Retry(String),
    /// Content error from the platform; retrying this asset is pointless
    Fatal(String),
}

/// Run one import batch. Deduplication happens here, before any remote
/// interaction; assets that fail keep the batch going so the report covers
/// every asset.
pub(crate) async fn run_batch(
    ctx: &StepContext<'_>,
    step: Step,
    section: &SectionMap,
    tag: BatchTag,
    urls: &[String],
) -> Result<BatchReport, UiError> {
    let deduped = dedupe(urls, tag);
    if deduped.duplicates_removed > 0 {
        tracing::info!(
            batch = %tag,
            removed = deduped.duplicates_removed,
            "duplicates dropped before import"
        );
    }
    let mut report = BatchReport::from_dedupe(&deduped);

    for asset in &deduped.assets {
        let record = import_asset(ctx, step, section, asset).await?;
        ctx.listener
            .on_progress(step, &format!("{}: {:?}", asset.decoded_filename, record.outcome))
            .await;
        report.record(record);
    }

    Ok(report)
}

/// Import a single asset, retrying up to the attempt budget. The preflight
/// existence check runs before every attempt, including retries, so a
/// partial failure can never attach the same asset twice.
async fn import_asset(
    ctx: &StepContext<'_>,
    step: Step,
    section: &SectionMap,
    asset: &NormalizedAsset,
) -> Result<AssetReport, UiError> {
    let mut last_reason = String::new();

    for attempt in 1..=ctx.config.attempt_budget {
        if attempt > 1 {
            sleep(ctx.config.attempt_delay).await;
        }

        if asset_present(ctx, asset).await? {
            tracing::debug!(asset = %asset.decoded_filename, "preflight hit, skipping");
            return Ok(AssetReport {
                url: asset.original_url.clone(),
                filename: asset.decoded_filename.clone(),
                outcome: AssetOutcome::Skipped,
                attempts: attempt,
            });
        }

        let outcome = match run_attempt(ctx, section, asset).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_transient() => Attempt::Retry(err.to_string()),
            Err(err) => return Err(err),
        };

        match outcome {
            Attempt::Verified => {
                return Ok(AssetReport {
                    url: asset.original_url.clone(),
                    filename: asset.decoded_filename.clone(),
                    outcome: AssetOutcome::Imported,
                    attempts: attempt,
                });
            }
            Attempt::Fatal(reason) => {
                ctx.capture(&format!("{step}-{}-content-error", asset.decoded_filename))
                    .await;
                return Ok(AssetReport {
                    url: asset.original_url.clone(),
                    filename: asset.decoded_filename.clone(),
                    outcome: AssetOutcome::Failed {
                        reason,
                        retryable: false,
                    },
                    attempts: attempt,
                });
            }
            Attempt::Retry(reason) => {
                tracing::warn!(
                    asset = %asset.decoded_filename,
                    attempt,
                    reason = %reason,
                    "import attempt failed"
                );
                ctx.capture(&format!(
                    "{step}-{}-attempt{attempt}",
                    asset.decoded_filename
                ))
                .await;
                last_reason = reason;
            }
        }
    }

    Ok(AssetReport {
        url: asset.original_url.clone(),
        filename: asset.decoded_filename.clone(),
        outcome: AssetOutcome::Failed {
            reason: last_reason,
            retryable: true,
        },
        attempts: ctx.config.attempt_budget,
    })
}

/// One pass of the sub-protocol: open dialog, fill, import, commit, verify.
async fn run_attempt(
    ctx: &StepContext<'_>,
    section: &SectionMap,
    asset: &NormalizedAsset,
) -> Result<Attempt, UiError> {
    // Open the add-via-link affordance.
    ctx.driver.click(&section.add_link_button).await?;
    if !ctx
        .observer
        .wait_present(ctx.driver, &section.url_input, ctx.config.element_timeout)
        .await?
    {
        return Ok(Attempt::Retry("add dialog did not open".to_string()));
    }

    // Fill the URL with read-back assertion.
    if !fill_verified(ctx, &section.url_input, &asset.original_url).await? {
        return Ok(Attempt::Retry("url input read-back mismatch".to_string()));
    }

    // Derive titles from filenames, when the section offers it.
    if let Some(toggle) = &section.titles_toggle {
        if !toggle_verified(ctx, toggle, true).await? {
            return Ok(Attempt::Retry("titles toggle read-back mismatch".to_string()));
        }
    }

    ctx.driver.click(&section.import_button).await?;

    // Remote processing may be slow; the bound here is the long one.
    match ctx
        .observer
        .wait_ready(ctx.driver, ctx.config.readiness_timeout)
        .await?
    {
        ReadyOutcome::Ready => {}
        ReadyOutcome::ErrorBanner(text) => return Ok(Attempt::Fatal(text)),
        ReadyOutcome::TimedOutBusy => {
            return Ok(Attempt::Retry(
                "import still processing at readiness bound".to_string(),
            ));
        }
        ReadyOutcome::TimedOutIdle => {
            return Ok(Attempt::Retry(
                "commit control never became ready".to_string(),
            ));
        }
    }

    ctx.driver.click(&ctx.page.signals.commit_button).await?;

    // A modal that refuses to close is a warning, not a failure; the
    // postcondition check decides.
    if !ctx
        .observer
        .wait_gone(ctx.driver, &section.modal, ctx.config.modal_timeout)
        .await?
    {
        tracing::warn!(section = %section.modal, "commit modal did not close, verifying anyway");
    }

    if verify_present(ctx, asset).await? {
        return Ok(Attempt::Verified);
    }

    // One reload, then a second bounded pass.
    ctx.driver.reload().await?;
    ctx.observer
        .wait_idle(ctx.driver, ctx.config.element_timeout)
        .await?;
    if verify_present(ctx, asset).await? {
        return Ok(Attempt::Verified);
    }

    // Only declare failure once the UI is confirmed idle.
    let snapshot = ctx.observer.snapshot(ctx.driver).await?;
    if snapshot.in_progress() {
        Ok(Attempt::Retry(
            "ui still busy during verification".to_string(),
        ))
    } else {
        Ok(Attempt::Retry(
            "asset absent after commit and reload".to_string(),
        ))
    }
}

/// Preflight/postcondition probe: present by filename, or by URL fragment
/// for assets without one.
pub(crate) async fn asset_present(
    ctx: &StepContext<'_>,
    asset: &NormalizedAsset,
) -> Result<bool, UiError> {
    if asset.has_filename() {
        if ctx
            .driver
            .exists(&ctx.page.item_named(&asset.decoded_filename))
            .await?
        {
            return Ok(true);
        }
        ctx.driver.page_contains(&asset.decoded_filename).await
    } else {
        ctx.driver.page_contains(&asset.canonical_url).await
    }
}

/// Poll for the asset's presence with exponential backoff, bounded by the
/// verification window.
async fn verify_present(ctx: &StepContext<'_>, asset: &NormalizedAsset) -> Result<bool, UiError> {
    let deadline = Instant::now() + ctx.config.verify_timeout;
    let mut backoff = Backoff::verification();
    loop {
        if asset_present(ctx, asset).await? {
            return Ok(true);
        }
        let delay = backoff.next_delay();
        if Instant::now() + delay > deadline {
            return Ok(false);
        }
        sleep(delay).await;
    }
}

/// Fill with read-back; on mismatch, retype slowly and read back once more.
pub(crate) async fn fill_verified(
    ctx: &StepContext<'_>,
    locator: &Locator,
    value: &str,
) -> Result<bool, UiError> {
    ctx.driver.fill(locator, value).await?;
    if ctx.driver.read_value(locator).await? == value {
        return Ok(true);
    }
    tracing::debug!(field = %locator, "read-back mismatch, retyping slowly");
    ctx.driver.type_slow(locator, value).await?;
    Ok(ctx.driver.read_value(locator).await? == value)
}

/// Set a toggle with read-back assertion.
pub(crate) async fn toggle_verified(
    ctx: &StepContext<'_>,
    locator: &Locator,
    on: bool,
) -> Result<bool, UiError> {
    ctx.driver.set_checked(locator, on).await?;
    Ok(ctx.driver.is_checked(locator).await? == on)
}
