//! Workflow Driver: executes the step sequence against a live UI session
//! and produces the final report.

use crate::config::WorkflowConfig;
use crate::error::{ErrorCode, RunError};
use crate::finalize::{self, ConfirmOutcome};
use crate::import;
use crate::plan::{DeliveryPlan, WorkflowReport};
use crate::progress::ProgressListener;
use crate::selectors::PageMap;
use crate::step::Step;
use crate::tour::{self, TourOutcome};
use courier_assets::BatchTag;
use courier_ui::{IdleOutcome, Observer, UiDriver};
use tokio::time::sleep;

/// Shared collaborators for one step execution.
pub(crate) struct StepContext<'a> {
    pub(crate) driver: &'a dyn UiDriver,
    pub(crate) observer: &'a Observer,
    pub(crate) page: &'a PageMap,
    pub(crate) config: &'a WorkflowConfig,
    pub(crate) listener: &'a dyn ProgressListener,
}

impl StepContext<'_> {
    /// Capture a screenshot and hand it to the listener. Evidence is best
    /// effort; a failed capture never fails the run.
    pub(crate) async fn capture(&self, label: &str) {
        match self.driver.screenshot().await {
            Ok(png) => self.listener.on_evidence(label, &png).await,
            Err(err) => tracing::debug!(label, error = %err, "evidence capture failed"),
        }
    }
}

/// Executes one delivery plan against a live session.
///
/// The driver owns the locator catalog and the timing configuration; the
/// session itself is passed in per execution so one driver can serve many
/// runs.
#[derive(Debug, Clone)]
pub struct WorkflowDriver {
    page: PageMap,
    config: WorkflowConfig,
}

impl Default for WorkflowDriver {
    fn default() -> Self {
        Self::new(PageMap::default(), WorkflowConfig::default())
    }
}

impl WorkflowDriver {
    #[must_use]
    pub fn new(page: PageMap, config: WorkflowConfig) -> Self {
        Self { page, config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the full step sequence. Never panics and never returns early
    /// without a report: every failure lands in `failed_step`/`error` with
    /// whatever partial batch reports were produced.
    pub async fn execute(
        &self,
        driver: &dyn UiDriver,
        plan: &DeliveryPlan,
        listener: &dyn ProgressListener,
    ) -> WorkflowReport {
        let observer = Observer::new(self.page.signals.clone())
            .with_poll_interval(self.config.poll_interval);
        let ctx = StepContext {
            driver,
            observer: &observer,
            page: &self.page,
            config: &self.config,
            listener,
        };

        let mut report = WorkflowReport::default();
        let mut tour_baseline = 0usize;
        let mut step = Step::FIRST;

        loop {
            tracing::info!(step = %step, "step started");
            listener.on_progress(step, "started").await;

            let result = self
                .run_step(&ctx, plan, step, &mut report, &mut tour_baseline)
                .await;

            match result {
                Ok(()) => {
                    listener.on_progress(step, "completed").await;
                    match step.next(plan.deliver_after_attach) {
                        Some(next) if !next.is_terminal() => step = next,
                        _ => {
                            tracing::info!("workflow done");
                            break;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(step = %step, code = %err.code, error = %err.message, "step failed");
                    ctx.capture(&format!("{step}-failed")).await;
                    listener.on_progress(Step::Failed, &err.message).await;
                    report.failed_step = Some(step);
                    report.error = Some(err);
                    break;
                }
            }
        }

        report
    }

    async fn run_step(
        &self,
        ctx: &StepContext<'_>,
        plan: &DeliveryPlan,
        step: Step,
        report: &mut WorkflowReport,
        tour_baseline: &mut usize,
    ) -> Result<(), RunError> {
        match step {
            Step::Nav => self.navigate(ctx, &plan.edit_url).await,

            Step::Baseline => {
                *tour_baseline = ctx.driver.count(&self.page.tour.rows).await?;
                tracing::debug!(tour_rows = *tour_baseline, "baseline captured");
                Ok(())
            }

            Step::ImportFloorplans => {
                if plan.floorplan_urls.is_empty() {
                    tracing::debug!("no floor plans in plan, skipping");
                    return Ok(());
                }
                let batch = import::run_batch(
                    ctx,
                    step,
                    &self.page.floorplans,
                    BatchTag::Floorplans,
                    &plan.floorplan_urls,
                )
                .await?;
                let verdict = batch_verdict(&batch, "floorplans");
                report.floorplans = Some(batch);
                report.actions.imported_floorplans = verdict.is_ok();
                verdict
            }

            Step::ImportFiles => {
                if plan.file_urls.is_empty() {
                    tracing::debug!("no files in plan, skipping");
                    return Ok(());
                }
                let batch = import::run_batch(
                    ctx,
                    step,
                    &self.page.files,
                    BatchTag::Files,
                    &plan.file_urls,
                )
                .await?;
                let verdict = batch_verdict(&batch, "files");
                report.files = Some(batch);
                report.actions.imported_files = verdict.is_ok();
                verdict
            }

            Step::Add3d => {
                let Some(tour_url) = &plan.tour_url else {
                    tracing::debug!("no tour in plan, skipping");
                    return Ok(());
                };
                match tour::add_tour(ctx, tour_url, *tour_baseline).await? {
                    TourOutcome::Added | TourOutcome::Skipped => {
                        report.actions.added_tour = true;
                        Ok(())
                    }
                    TourOutcome::Failed(reason) => Err(RunError::new(
                        ErrorCode::ActionFailed,
                        format!("tour: {reason}"),
                    )),
                }
            }

            Step::Save => {
                let outcome = finalize::run_action(ctx, step, &self.page.save_button).await?;
                report.actions.saved = outcome.succeeded();
                confirm_verdict(outcome, "save")
            }

            Step::Deliver => {
                let outcome = finalize::run_action(ctx, step, &self.page.deliver_button).await?;
                report.actions.delivered = outcome.succeeded();
                confirm_verdict(outcome, "deliver")
            }

            // Terminal steps never reach run_step.
            Step::Done | Step::Failed => Ok(()),
        }
    }

    /// Navigate to the listing editor and wait for it to settle, within the
    /// attempt budget. Transport failures exhaust into `NavigationFailed`;
    /// a page that loads but never leaves its busy state exhausts into
    /// `Timeout`.
    async fn navigate(&self, ctx: &StepContext<'_>, edit_url: &str) -> Result<(), RunError> {
        let mut last = RunError::new(ErrorCode::NavigationFailed, "navigation never attempted");

        for attempt in 1..=self.config.attempt_budget {
            if attempt > 1 {
                sleep(self.config.attempt_delay).await;
            }

            match ctx.driver.goto(edit_url).await {
                Ok(()) => {
                    match ctx
                        .observer
                        .wait_idle(ctx.driver, self.config.readiness_timeout)
                        .await?
                    {
                        IdleOutcome::Idle => return Ok(()),
                        IdleOutcome::TimedOut => {
                            last = RunError::new(
                                ErrorCode::Timeout,
                                "page never settled after navigation",
                            );
                        }
                    }
                }
                Err(err) if err.is_transient() => {
                    last = RunError::new(ErrorCode::NavigationFailed, err.to_string());
                }
                Err(err) => return Err(err.into()),
            }
            tracing::warn!(attempt, reason = %last.message, "navigation attempt failed");
        }

        Err(last)
    }
}

/// Turn a batch report into the step verdict. A batch with any failed asset
/// fails the step; retryability follows the first failed asset.
fn batch_verdict(batch: &crate::plan::BatchReport, label: &str) -> Result<(), RunError> {
    if batch.complete() {
        return Ok(());
    }
    match batch.first_failure() {
        Some(asset) => {
            let (reason, retryable) = match &asset.outcome {
                crate::plan::AssetOutcome::Failed { reason, retryable } => {
                    (reason.clone(), *retryable)
                }
                _ => (String::from("unknown failure"), true),
            };
            Err(RunError::with_retryable(
                ErrorCode::ActionFailed,
                format!("{label}: {}: {reason}", asset.filename),
                retryable,
            ))
        }
        None => Err(RunError::new(
            ErrorCode::InternalError,
            format!("{label}: incomplete batch without a recorded failure"),
        )),
    }
}

/// Turn a save/deliver outcome into the step verdict.
fn confirm_verdict(outcome: ConfirmOutcome, label: &str) -> Result<(), RunError> {
    match outcome {
        ConfirmOutcome::Confirmed | ConfirmOutcome::Inconclusive => Ok(()),
        ConfirmOutcome::Rejected(text) => Err(RunError::with_retryable(
            ErrorCode::ActionFailed,
            format!("{label} rejected: {text}"),
            false,
        )),
        ConfirmOutcome::TransientError(text) => Err(RunError::new(
            ErrorCode::ActionFailed,
            format!("{label} failed transiently: {text}"),
        )),
    }
}
