//! Signed HTTP terminal-state callbacks.

use crate::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use async_trait::async_trait;
use courier_run::{Run, TerminalNotifier};
use std::time::Duration;
use tracing::{debug, warn};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts the terminal run record to the manifest's callback target,
/// signed with the target's shared secret.
///
/// Delivery is best-effort: failures are logged and never fed back into
/// run state.
pub struct HttpCallbackNotifier {
    http: reqwest::Client,
}

impl HttpCallbackNotifier {
    #[must_use]
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for HttpCallbackNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalNotifier for HttpCallbackNotifier {
    async fn notify(&self, run: &Run) {
        let Some(callback) = &run.manifest.callback else {
            debug!(run_id = %run.run_id, "no callback target, skipping notification");
            return;
        };

        let body = match serde_json::to_string(run) {
            Ok(body) => body,
            Err(err) => {
                warn!(run_id = %run.run_id, error = %err, "callback body serialization failed");
                return;
            }
        };

        let unix_ms = chrono::Utc::now().timestamp_millis();
        let sig = signature::sign(callback.secret.as_bytes(), unix_ms, body.as_bytes());

        let result = self
            .http
            .post(&callback.url)
            .header(TIMESTAMP_HEADER, unix_ms.to_string())
            .header(SIGNATURE_HEADER, sig)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(run_id = %run.run_id, url = %callback.url, "callback delivered");
            }
            Ok(response) => {
                warn!(
                    run_id = %run.run_id,
                    url = %callback.url,
                    status = %response.status(),
                    "callback rejected by receiver"
                );
            }
            Err(err) => {
                warn!(run_id = %run.run_id, url = %callback.url, error = %err, "callback failed");
            }
        }
    }
}
