//! Run record, manifest, and idempotency key.

use chrono::{DateTime, Utc};
use courier_assets::canonical_url;
use courier_workflow::{ActionsPerformed, BatchReport, DeliveryPlan, RunError, Step};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use url::Url;

/// Sortable run identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from its canonical string form.
    ///
    /// # Errors
    /// Returns the underlying decode error for malformed input.
    pub fn parse(raw: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(raw)?))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run lifecycle status. Transitions are monotonic:
/// `Queued → Running → {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }

    /// Whether the transition moves forward.
    #[must_use]
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Queued, RunStatus::Running)
                | (RunStatus::Queued, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// The listing being written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTarget {
    /// Edit URL of the listing on the target platform
    pub edit_url: String,
    /// Stable platform identifier, when the caller knows it
    #[serde(default)]
    pub listing_id: Option<String>,
}

/// Where to POST the signed terminal-state callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTarget {
    pub url: String,
    /// Shared HMAC secret; never serialized back out
    #[serde(skip_serializing, default)]
    pub secret: String,
}

/// Caller-submitted work description. Immutable after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub listing: ListingTarget,
    #[serde(default)]
    pub floorplan_urls: Vec<String>,
    #[serde(default)]
    pub file_urls: Vec<String>,
    #[serde(default)]
    pub tour_url: Option<String>,
    #[serde(default)]
    pub deliver_after_attach: bool,
    #[serde(default)]
    pub callback: Option<CallbackTarget>,
}

impl Manifest {
    /// Validate caller input.
    ///
    /// # Errors
    /// A human-readable reason for each rejection; the caller maps it to
    /// `InvalidManifest`.
    pub fn validate(&self) -> Result<(), String> {
        match Url::parse(&self.listing.edit_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => return Err(format!("edit_url scheme {} not supported", url.scheme())),
            Err(e) => return Err(format!("edit_url does not parse: {e}")),
        }
        if self.floorplan_urls.is_empty() && self.file_urls.is_empty() && self.tour_url.is_none()
        {
            return Err("manifest carries no assets".to_string());
        }
        if let Some(callback) = &self.callback {
            if let Err(e) = Url::parse(&callback.url) {
                return Err(format!("callback url does not parse: {e}"));
            }
        }
        Ok(())
    }

    /// The workflow input derived from this manifest.
    #[must_use]
    pub fn plan(&self) -> DeliveryPlan {
        DeliveryPlan {
            edit_url: self.listing.edit_url.clone(),
            floorplan_urls: self.floorplan_urls.clone(),
            file_urls: self.file_urls.clone(),
            tour_url: self.tour_url.clone(),
            deliver_after_attach: self.deliver_after_attach,
        }
    }
}

/// Normalized listing identity used to deduplicate submissions.
///
/// Derived only from stable identity: the platform listing id when known,
/// otherwise the canonicalized edit URL. Deliberately carries no wall-clock
/// component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    #[must_use]
    pub fn derive(manifest: &Manifest) -> Self {
        match manifest.listing.listing_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Self(format!("listing:{}", id.trim())),
            _ => Self(format!(
                "url:{}",
                canonical_url(&manifest.listing.edit_url)
            )),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One progress event on a run's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub at: DateTime<Utc>,
    pub step: Step,
    pub detail: String,
}

/// The run record: one submission's whole observable lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub idempotency_key: IdempotencyKey,
    pub status: RunStatus,
    pub manifest: Manifest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_step: Option<Step>,
    #[serde(default)]
    pub progress: Vec<ProgressEvent>,
    #[serde(default)]
    pub error: Option<RunError>,
    #[serde(default)]
    pub actions_performed: ActionsPerformed,
    #[serde(default)]
    pub floorplans: Option<BatchReport>,
    #[serde(default)]
    pub files: Option<BatchReport>,
    /// Stored evidence handles (paths or labels), in capture order
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl Run {
    /// Fresh queued run for a validated manifest.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::new(),
            idempotency_key: IdempotencyKey::derive(&manifest),
            status: RunStatus::Queued,
            manifest,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            current_step: None,
            progress: Vec::new(),
            error: None,
            actions_performed: ActionsPerformed::default(),
            floorplans: None,
            files: None,
            evidence: Vec::new(),
        }
    }
}
