//! State transitions for the extraction workflow.
//!
//! Every event source (file picker, drop target, submit button, service response)
//! funnels into [`ProcessingState::apply`], so the allowed moves live in one place:
//!
//! ```text
//!            ┌──────────select──────────┐
//!            v                          │
//!         Idle ──submit──> Submitting ──succeeded──> Completed
//!          ^                    │
//!          │                    └──failed──> Failed ──acknowledge / select──┐
//!          └────────────────────────────────────────────────────────────────┘
//!
//! Failed ──submit──> Submitting   (user resubmits the same batch)
//! ```
//!
//! While `Submitting`, both `select` and `submit` are refused with
//! [`ExtractorError::SubmissionInFlight`]; that refusal is the single-flight guard.

use chrono::Utc;

use super::state::{ProcessingState, WorkflowEvent};
use crate::error::{ExtractorError, Result};

impl ProcessingState {
    /// Compute the state that follows `event`, or refuse the event.
    ///
    /// Refusals never change the state: callers keep `self` when this returns `Err`.
    pub fn apply(&self, event: &WorkflowEvent) -> Result<ProcessingState> {
        use ProcessingState::*;
        use WorkflowEvent::*;

        match (self, event) {
            (Submitting { .. }, Selected { .. } | SubmitStarted { .. }) => {
                Err(ExtractorError::SubmissionInFlight)
            }

            // A new selection supersedes any earlier outcome.
            (Idle | Completed { .. } | Failed { .. }, Selected { .. }) => Ok(Idle),

            (Idle | Failed { .. }, SubmitStarted { batch_id }) => Ok(Submitting {
                batch_id: *batch_id,
                started_at: Utc::now(),
            }),

            (Submitting { batch_id, .. }, SubmitSucceeded { codes }) => Ok(Completed {
                batch_id: *batch_id,
                codes: *codes,
                completed_at: Utc::now(),
            }),

            (Submitting { .. }, SubmitFailed(error)) => Ok(Failed {
                reason: error.message().to_string(),
                failed_at: Utc::now(),
            }),

            (Failed { .. }, FailureAcknowledged) => Ok(Idle),

            (state, event) => Err(ExtractorError::InvalidState(
                state.as_str(),
                event.action(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::BatchId;
    use crate::error::SubmissionError;
    use uuid::Uuid;

    fn batch_id() -> BatchId {
        BatchId(Uuid::new_v4())
    }

    fn submitting() -> (BatchId, ProcessingState) {
        let id = batch_id();
        let state = ProcessingState::Idle
            .apply(&WorkflowEvent::SubmitStarted { batch_id: id })
            .unwrap();
        (id, state)
    }

    fn failed(reason: &str) -> ProcessingState {
        let (_, state) = submitting();
        state
            .apply(&WorkflowEvent::SubmitFailed(SubmissionError::ServerRejected(
                reason.to_string(),
            )))
            .unwrap()
    }

    #[test]
    fn test_idle_to_submitting_to_completed() {
        let (id, state) = submitting();
        assert!(state.is_submitting());

        let state = state
            .apply(&WorkflowEvent::SubmitSucceeded { codes: 2 })
            .unwrap();
        match state {
            ProcessingState::Completed {
                batch_id, codes, ..
            } => {
                assert_eq!(batch_id, id);
                assert_eq!(codes, 2);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_codes_still_completes() {
        let (_, state) = submitting();
        let state = state
            .apply(&WorkflowEvent::SubmitSucceeded { codes: 0 })
            .unwrap();
        assert_eq!(state.as_str(), "completed");
    }

    #[test]
    fn test_failure_records_server_message() {
        let state = failed("busy");
        assert_eq!(state.failure_reason(), Some("busy"));
    }

    #[test]
    fn test_transport_failure_records_cause() {
        let (_, state) = submitting();
        let state = state
            .apply(&WorkflowEvent::SubmitFailed(SubmissionError::Transport(
                "connection refused".to_string(),
            )))
            .unwrap();
        assert_eq!(state.failure_reason(), Some("connection refused"));
    }

    #[test]
    fn test_submitting_refuses_second_submit_and_selection() {
        let (_, state) = submitting();

        let err = state
            .apply(&WorkflowEvent::SubmitStarted {
                batch_id: batch_id(),
            })
            .unwrap_err();
        assert!(matches!(err, ExtractorError::SubmissionInFlight));

        let err = state
            .apply(&WorkflowEvent::Selected {
                batch_id: batch_id(),
            })
            .unwrap_err();
        assert!(matches!(err, ExtractorError::SubmissionInFlight));
    }

    #[test]
    fn test_failed_can_resubmit_or_return_to_idle() {
        let state = failed("busy");
        assert!(state.accepts_submission());

        let resubmitted = state
            .apply(&WorkflowEvent::SubmitStarted {
                batch_id: batch_id(),
            })
            .unwrap();
        assert!(resubmitted.is_submitting());

        let idle = state.apply(&WorkflowEvent::FailureAcknowledged).unwrap();
        assert_eq!(idle, ProcessingState::Idle);

        let idle = state
            .apply(&WorkflowEvent::Selected {
                batch_id: batch_id(),
            })
            .unwrap();
        assert_eq!(idle, ProcessingState::Idle);
    }

    #[test]
    fn test_completed_requires_new_selection_before_submit() {
        let (_, state) = submitting();
        let completed = state
            .apply(&WorkflowEvent::SubmitSucceeded { codes: 1 })
            .unwrap();

        let err = completed
            .apply(&WorkflowEvent::SubmitStarted {
                batch_id: batch_id(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::InvalidState("completed", "submit")
        ));

        let idle = completed
            .apply(&WorkflowEvent::Selected {
                batch_id: batch_id(),
            })
            .unwrap();
        assert_eq!(idle, ProcessingState::Idle);
    }

    #[test]
    fn test_responses_outside_submitting_are_invalid() {
        let err = ProcessingState::Idle
            .apply(&WorkflowEvent::SubmitSucceeded { codes: 1 })
            .unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidState("idle", "complete")));

        let err = ProcessingState::Idle
            .apply(&WorkflowEvent::FailureAcknowledged)
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::InvalidState("idle", "acknowledge failure")
        ));
    }
}
