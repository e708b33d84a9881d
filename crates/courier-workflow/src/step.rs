//! Workflow step sequence.

use serde::{Deserialize, Serialize};

/// One state of the delivery workflow.
///
/// Sequence: `Nav → Baseline → ImportFloorplans → ImportFiles → Add3d →
/// Save → (Deliver) → Done`; any non-terminal step may transition to
/// `Failed` once its local retry budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Nav,
    Baseline,
    ImportFloorplans,
    ImportFiles,
    Add3d,
    Save,
    Deliver,
    Done,
    Failed,
}

/// Illegal step transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal step transition")]
pub struct IllegalTransition;

impl Step {
    /// First step of every run.
    pub const FIRST: Step = Step::Nav;

    /// Successor in the happy path. `deliver` selects whether the run ends
    /// with the platform's deliver action.
    #[must_use]
    pub fn next(self, deliver: bool) -> Option<Step> {
        use Step::*;
        match self {
            Nav => Some(Baseline),
            Baseline => Some(ImportFloorplans),
            ImportFloorplans => Some(ImportFiles),
            ImportFiles => Some(Add3d),
            Add3d => Some(Save),
            Save => {
                if deliver {
                    Some(Deliver)
                } else {
                    Some(Done)
                }
            }
            Deliver => Some(Done),
            Done | Failed => None,
        }
    }

    /// Whether the step is terminal.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Step::Done | Step::Failed)
    }

    /// Snake-case name used in progress records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Nav => "nav",
            Step::Baseline => "baseline",
            Step::ImportFloorplans => "import_floorplans",
            Step::ImportFiles => "import_files",
            Step::Add3d => "add_3d",
            Step::Save => "save",
            Step::Deliver => "deliver",
            Step::Done => "done",
            Step::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transitions allowed from a step.
#[must_use]
pub fn allowed_transitions(from: Step, deliver: bool) -> Vec<Step> {
    match from.next(deliver) {
        Some(next) => vec![next, Step::Failed],
        None => vec![],
    }
}

/// Validate a step transition.
pub fn validate_transition(from: Step, to: Step, deliver: bool) -> Result<(), IllegalTransition> {
    if allowed_transitions(from, deliver).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition)
    }
}
