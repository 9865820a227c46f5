//! Processing state of the workflow.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::batch::BatchId;
use crate::error::SubmissionError;

/// Status of the current batch with respect to the recognition service.
///
/// Exactly one state is active at a time. The workflow controller is the only
/// writer; see [`transitions`](super::transitions) for the allowed moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessingState {
    /// Nothing in flight; a batch may or may not be selected.
    #[default]
    Idle,
    /// One request is in flight for `batch_id`.
    Submitting {
        batch_id: BatchId,
        started_at: DateTime<Utc>,
    },
    /// The service returned a code list for `batch_id`.
    Completed {
        batch_id: BatchId,
        codes: usize,
        completed_at: DateTime<Utc>,
    },
    /// The last submission failed; `reason` is shown to the user.
    Failed {
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Idle => "idle",
            ProcessingState::Submitting { .. } => "submitting",
            ProcessingState::Completed { .. } => "completed",
            ProcessingState::Failed { .. } => "failed",
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, ProcessingState::Submitting { .. })
    }

    /// Whether a new submission may start from this state.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, ProcessingState::Idle | ProcessingState::Failed { .. })
    }

    /// Failure message, if the last submission failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ProcessingState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to the workflow: a user action or a service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A new batch was accepted by intake.
    Selected { batch_id: BatchId },
    /// The user asked to submit `batch_id`.
    SubmitStarted { batch_id: BatchId },
    /// The service returned `codes` codes.
    SubmitSucceeded { codes: usize },
    /// The submission ended without a result.
    SubmitFailed(SubmissionError),
    /// The user dismissed the failure notice.
    FailureAcknowledged,
}

impl WorkflowEvent {
    /// Verb used in invalid-transition errors.
    pub fn action(&self) -> &'static str {
        match self {
            WorkflowEvent::Selected { .. } => "select files",
            WorkflowEvent::SubmitStarted { .. } => "submit",
            WorkflowEvent::SubmitSucceeded { .. } => "complete",
            WorkflowEvent::SubmitFailed(_) => "fail",
            WorkflowEvent::FailureAcknowledged => "acknowledge failure",
        }
    }
}
