//! Workflow input and output types.

use crate::error::RunError;
use crate::step::Step;
use courier_assets::{DedupeReport, DropReason};
use serde::{Deserialize, Serialize};

/// Everything the workflow needs to drive one listing.
///
/// Built once from the validated manifest; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPlan {
    /// Edit URL of the target listing
    pub edit_url: String,
    /// Floor plan source URLs (pre-dedup)
    pub floorplan_urls: Vec<String>,
    /// Auxiliary file source URLs (pre-dedup)
    pub file_urls: Vec<String>,
    /// Single 3D tour URL
    pub tour_url: Option<String>,
    /// Whether to trigger the platform's deliver action after saving
    pub deliver_after_attach: bool,
}

/// Verified-effect flags; each is set true only after an independent
/// postcondition check succeeded, never merely because an action was
/// issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsPerformed {
    pub imported_floorplans: bool,
    pub imported_files: bool,
    pub added_tour: bool,
    pub saved: bool,
    pub delivered: bool,
}

/// Outcome for one asset in an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AssetOutcome {
    /// Verified present after import
    Imported,
    /// Preflight found it already attached
    Skipped,
    /// Declared failed with the UI confirmed idle
    Failed {
        /// What went wrong
        reason: String,
        /// Whether another run may succeed
        retryable: bool,
    },
}

impl AssetOutcome {
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, AssetOutcome::Failed { .. })
    }
}

/// Per-asset record inside a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReport {
    /// Source URL as submitted
    pub url: String,
    /// Decoded filename used for preflight/verification
    pub filename: String,
    /// Final outcome
    pub outcome: AssetOutcome,
    /// Attempts consumed
    pub attempts: u32,
}

/// Result of one import batch (floor plans or files).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Assets after deduplication
    pub total: usize,
    /// Verified imports
    pub imported: usize,
    /// Preflight skips
    pub skipped: usize,
    /// Failures
    pub failed: usize,
    /// Per-asset details
    pub assets: Vec<AssetReport>,
    /// Duplicates removed before any remote interaction
    pub duplicates_removed: usize,
    /// Drop audit carried over from deduplication
    pub dropped: Vec<DroppedAsset>,
}

/// Drop audit entry carried into the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedAsset {
    pub dropped_url: String,
    pub reason: DropReason,
    pub kept_url: String,
}

impl BatchReport {
    /// Start a report from a dedup result.
    #[must_use]
    pub fn from_dedupe(report: &DedupeReport) -> Self {
        Self {
            total: report.kept.len(),
            duplicates_removed: report.duplicates_removed,
            dropped: report
                .dropped
                .iter()
                .map(|d| DroppedAsset {
                    dropped_url: d.dropped_url.clone(),
                    reason: d.reason,
                    kept_url: d.kept_url.clone(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Record one asset outcome.
    pub fn record(&mut self, asset: AssetReport) {
        match asset.outcome {
            AssetOutcome::Imported => self.imported += 1,
            AssetOutcome::Skipped => self.skipped += 1,
            AssetOutcome::Failed { .. } => self.failed += 1,
        }
        self.assets.push(asset);
    }

    /// The step-level imported flag: every non-skipped asset verified.
    #[inline]
    #[must_use]
    pub fn complete(&self) -> bool {
        self.imported + self.skipped == self.total
    }

    /// First failure, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&AssetReport> {
        self.assets.iter().find(|a| a.outcome.is_failed())
    }
}

/// Final report of one workflow execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Verified-effect flags
    pub actions: ActionsPerformed,
    /// Floor plan batch, when the plan carried floor plans
    pub floorplans: Option<BatchReport>,
    /// File batch, when the plan carried files
    pub files: Option<BatchReport>,
    /// Step the run failed in, if it failed
    pub failed_step: Option<Step>,
    /// Structured terminal error, if the run failed
    pub error: Option<RunError>,
}

impl WorkflowReport {
    /// Whether the workflow reached `Done`.
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_complete_iff_all_non_skipped_verified() {
        let mut batch = BatchReport {
            total: 3,
            ..BatchReport::default()
        };
        batch.record(AssetReport {
            url: "u1".into(),
            filename: "a.pdf".into(),
            outcome: AssetOutcome::Imported,
            attempts: 1,
        });
        batch.record(AssetReport {
            url: "u2".into(),
            filename: "b.pdf".into(),
            outcome: AssetOutcome::Skipped,
            attempts: 1,
        });
        assert!(!batch.complete());

        batch.record(AssetReport {
            url: "u3".into(),
            filename: "c.pdf".into(),
            outcome: AssetOutcome::Imported,
            attempts: 2,
        });
        assert!(batch.complete());
    }

    #[test]
    fn failed_asset_blocks_completion() {
        let mut batch = BatchReport {
            total: 1,
            ..BatchReport::default()
        };
        batch.record(AssetReport {
            url: "u".into(),
            filename: "a.pdf".into(),
            outcome: AssetOutcome::Failed {
                reason: "absent after reload".into(),
                retryable: true,
            },
            attempts: 3,
        });
        assert!(!batch.complete());
        assert!(batch.first_failure().is_some());
    }
}
