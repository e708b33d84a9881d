//! UI State Observer: polls the driver's signal set and reduces it to
//! decisions, with debounced readiness and explicit upper bounds on every
//! wait.

use crate::driver::{Locator, UiDriver, UiError};
use crate::snapshot::UiSnapshot;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Number of consecutive ready polls required before readiness is trusted.
pub const READY_DEBOUNCE: u32 = 3;

/// Default poll tick.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Locators for the fixed set of observable signals on the target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMap {
    /// Progress indicator
    pub progress_bar: Locator,
    /// Attribute carrying the completion percentage
    pub progress_percent_attr: String,
    /// Skeleton loader
    pub skeleton: Locator,
    /// Modal spinner
    pub modal_spinner: Locator,
    /// Staged (uncommitted) item row
    pub staged_item: Locator,
    /// Filename cell of the staged item
    pub staged_item_name: Locator,
    /// Commit control
    pub commit_button: Locator,
    /// Error banner
    pub error_banner: Locator,
    /// Lowercase markers that mark a staged name as still-resolving
    pub placeholder_markers: Vec<String>,
}

impl SignalMap {
    /// Whether a staged item name counts as a real filename rather than a
    /// still-resolving placeholder.
    #[must_use]
    pub fn is_real_filename(&self, name: &str) -> bool {
        let trimmed = name.trim().to_lowercase();
        if trimmed.is_empty() {
            return false;
        }
        !self
            .placeholder_markers
            .iter()
            .any(|marker| trimmed.contains(marker))
    }
}

/// Outcome of a bounded readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// `ready_for_commit` held for the full debounce window
    Ready,
    /// An error banner appeared while waiting
    ErrorBanner(String),
    /// Deadline passed while the UI was still in progress
    TimedOutBusy,
    /// Deadline passed with the UI idle but never ready
    TimedOutIdle,
}

/// Outcome of a bounded idle wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// UI settled (not `in_progress`)
    Idle,
    /// Deadline passed with loading signals still active
    TimedOut,
}

/// Polls a driver's signals on a fixed tick.
///
/// Readiness is only trusted after `ready_for_commit` holds for
/// [`READY_DEBOUNCE`] consecutive polls, so a transient flicker never
/// declares readiness.
#[derive(Debug, Clone)]
pub struct Observer {
    signals: SignalMap,
    poll_interval: Duration,
    debounce: u32,
}

impl Observer {
    /// Observer with the default tick and debounce.
    #[must_use]
    pub fn new(signals: SignalMap) -> Self {
        Self {
            signals,
            poll_interval: POLL_INTERVAL,
            debounce: READY_DEBOUNCE,
        }
    }

    /// Override the poll tick (tests shorten it).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Signal locators in use.
    #[inline]
    #[must_use]
    pub fn signals(&self) -> &SignalMap {
        &self.signals
    }

    /// One snapshot of the page.
    pub async fn snapshot(&self, driver: &dyn UiDriver) -> Result<UiSnapshot, UiError> {
        driver.poll_signals(&self.signals).await
    }

    /// Wait until the page is ready for commit, bounded by `timeout`.
    ///
    /// An error banner short-circuits the wait. A timeout is classified by
    /// the last snapshot: still `in_progress` means the remote side was
    /// working (retryable), idle means it silently never became ready.
    pub async fn wait_ready(
        &self,
        driver: &dyn UiDriver,
        timeout: Duration,
    ) -> Result<ReadyOutcome, UiError> {
        let deadline = Instant::now() + timeout;
        let mut streak = 0u32;
        let mut last;

        loop {
            last = self.snapshot(driver).await?;

            if last.has_error_banner {
                let text = last.error_text.clone().unwrap_or_default();
                tracing::debug!(error = %text, "error banner during readiness wait");
                return Ok(ReadyOutcome::ErrorBanner(text));
            }

            if last.ready_for_commit() {
                streak += 1;
                if streak >= self.debounce {
                    return Ok(ReadyOutcome::Ready);
                }
            } else {
                streak = 0;
            }

            if Instant::now() + self.poll_interval > deadline {
                break;
            }
            sleep(self.poll_interval).await;
        }

        Ok(if last.in_progress() {
            ReadyOutcome::TimedOutBusy
        } else {
            ReadyOutcome::TimedOutIdle
        })
    }

    /// Wait until no loading signal is active, bounded by `timeout`.
    pub async fn wait_idle(
        &self,
        driver: &dyn UiDriver,
        timeout: Duration,
    ) -> Result<IdleOutcome, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.snapshot(driver).await?;
            if !snapshot.in_progress() {
                return Ok(IdleOutcome::Idle);
            }
            if Instant::now() + self.poll_interval > deadline {
                return Ok(IdleOutcome::TimedOut);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Wait for an element to appear, bounded by `timeout`. Returns whether
    /// it resolved before the deadline.
    pub async fn wait_present(
        &self,
        driver: &dyn UiDriver,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            if driver.exists(locator).await? {
                return Ok(true);
            }
            if Instant::now() + self.poll_interval > deadline {
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Wait for an element to disappear, bounded by `timeout`. Returns
    /// whether it was gone before the deadline.
    pub async fn wait_gone(
        &self,
        driver: &dyn UiDriver,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !driver.exists(locator).await? {
                return Ok(true);
            }
            if Instant::now() + self.poll_interval > deadline {
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Driver that replays a fixed sequence of snapshots, holding the last
    /// one once the script runs out.
    struct FrameDriver {
        frames: Mutex<VecDeque<UiSnapshot>>,
        last: Mutex<UiSnapshot>,
    }

    impl FrameDriver {
        fn new(frames: Vec<UiSnapshot>) -> Self {
            Self {
                frames: Mutex::new(frames.into()),
                last: Mutex::new(UiSnapshot::default()),
            }
        }
    }

    #[async_trait]
    impl UiDriver for FrameDriver {
        async fn goto(&self, _url: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn reload(&self) -> Result<(), UiError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, UiError> {
            Ok(String::new())
        }
        async fn click(&self, _l: &Locator) -> Result<(), UiError> {
            Ok(())
        }
        async fn fill(&self, _l: &Locator, _v: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn type_slow(&self, _l: &Locator, _v: &str) -> Result<(), UiError> {
            Ok(())
        }
        async fn read_value(&self, _l: &Locator) -> Result<String, UiError> {
            Ok(String::new())
        }
        async fn text(&self, _l: &Locator) -> Result<Option<String>, UiError> {
            Ok(None)
        }
        async fn attr(&self, _l: &Locator, _n: &str) -> Result<Option<String>, UiError> {
            Ok(None)
        }
        async fn count(&self, _l: &Locator) -> Result<usize, UiError> {
            Ok(0)
        }
        async fn is_visible(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn is_enabled(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn is_checked(&self, _l: &Locator) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn set_checked(&self, _l: &Locator, _on: bool) -> Result<(), UiError> {
            Ok(())
        }
        async fn page_contains(&self, _needle: &str) -> Result<bool, UiError> {
            Ok(false)
        }
        async fn screenshot(&self) -> Result<Vec<u8>, UiError> {
            Ok(Vec::new())
        }
        async fn close(&self) -> Result<(), UiError> {
            Ok(())
        }

        async fn poll_signals(&self, _signals: &SignalMap) -> Result<UiSnapshot, UiError> {
            if let Some(frame) = self.frames.lock().pop_front() {
                *self.last.lock() = frame;
            }
            Ok(self.last.lock().clone())
        }
    }

    fn signals() -> SignalMap {
        SignalMap {
            progress_bar: Locator::css("progress", ".progress"),
            progress_percent_attr: "aria-valuenow".into(),
            skeleton: Locator::css("skeleton", ".skeleton"),
            modal_spinner: Locator::css("spinner", ".spinner"),
            staged_item: Locator::css("staged", ".staged"),
            staged_item_name: Locator::css("staged name", ".staged .name"),
            commit_button: Locator::css("commit", "#commit"),
            error_banner: Locator::css("error banner", ".banner-error"),
            placeholder_markers: vec!["uploading".into(), "processing".into()],
        }
    }

    fn observer() -> Observer {
        Observer::new(signals()).with_poll_interval(Duration::from_millis(1))
    }

    fn ready() -> UiSnapshot {
        UiSnapshot {
            has_staged_item: true,
            has_real_filename: true,
            commit_visible: true,
            commit_enabled: true,
            ..UiSnapshot::default()
        }
    }

    fn busy() -> UiSnapshot {
        UiSnapshot {
            progress_active: true,
            progress_percent: Some(40),
            ..UiSnapshot::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_requires_three_consecutive_polls() {
        // ready, ready, flicker, then ready steadily
        let driver = FrameDriver::new(vec![ready(), ready(), busy(), ready(), ready(), ready()]);
        let outcome = observer()
            .wait_ready(&driver, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome, ReadyOutcome::Ready);
        // the flicker frame must have been consumed (streak reset happened)
        assert!(driver.frames.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn error_banner_short_circuits() {
        let banner = UiSnapshot {
            has_error_banner: true,
            error_text: Some("unsupported format".into()),
            ..UiSnapshot::default()
        };
        let driver = FrameDriver::new(vec![busy(), banner]);
        let outcome = observer()
            .wait_ready(&driver, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReadyOutcome::ErrorBanner("unsupported format".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_while_busy_is_distinguished_from_idle() {
        let driver = FrameDriver::new(vec![busy()]);
        let outcome = observer()
            .wait_ready(&driver, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(outcome, ReadyOutcome::TimedOutBusy);

        let driver = FrameDriver::new(vec![UiSnapshot::default()]);
        let outcome = observer()
            .wait_ready(&driver, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(outcome, ReadyOutcome::TimedOutIdle);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_settles() {
        let driver = FrameDriver::new(vec![busy(), busy(), UiSnapshot::default()]);
        let outcome = observer()
            .wait_idle(&driver, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_times_out() {
        let driver = FrameDriver::new(vec![busy()]);
        let outcome = observer()
            .wait_idle(&driver, Duration::from_millis(3))
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::TimedOut);
    }
}
