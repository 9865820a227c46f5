//! Workflow controller: the single owner of batch, state and result.
//!
//! A [`Workflow`] reacts to three kinds of event: a new selection, a submit request
//! and the service's answer. Each one goes through
//! [`ProcessingState::apply`], so an event that is not allowed in the current state
//! is refused without touching anything.
//!
//! The internal mutex is only held between await points. The `Submitting` state is
//! what keeps a second submission (or a new selection) from interleaving with one
//! that is already in flight.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::auth::Session;
use crate::config::ExtractorConfig;
use crate::domain::{
    Batch, ExtractionResult, FileHandle, PreviewRegistry, ProcessingState, SubmissionSummary,
    WorkflowEvent,
};
use crate::error::{ExtractorError, Result, SubmissionError};
use crate::export::{ExportArtifact, ExportFormat, export_as};
use crate::http::{ExtractionClient, ExtractionRequest};
use crate::intake::{self, IntakeSource, SelectionSummary};
use crate::submit::submit_batch;

#[derive(Default)]
struct WorkflowInner {
    state: ProcessingState,
    batch: Option<Arc<Batch>>,
    /// Set only by a successful submission of the current batch
    result: Option<ExtractionResult>,
}

/// Batch workflow for one user session.
pub struct Workflow<C: ExtractionClient> {
    client: C,
    config: ExtractorConfig,
    session: Session,
    previews: PreviewRegistry,
    inner: Mutex<WorkflowInner>,
}

impl<C: ExtractionClient> Workflow<C> {
    pub fn new(client: C, config: ExtractorConfig, session: Session) -> Self {
        Self {
            client,
            config,
            session,
            previews: PreviewRegistry::new(),
            inner: Mutex::new(WorkflowInner::default()),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> ProcessingState {
        self.inner.lock().state.clone()
    }

    /// The current batch, if a selection has been accepted.
    pub fn batch(&self) -> Option<Arc<Batch>> {
        self.inner.lock().batch.clone()
    }

    /// Codes from the last successful submission of the current batch.
    pub fn result(&self) -> Option<ExtractionResult> {
        self.inner.lock().result.clone()
    }

    /// Counts for the completion notice, once a result exists.
    pub fn summary(&self) -> Option<SubmissionSummary> {
        let inner = self.inner.lock();
        let result = inner.result.as_ref()?;
        Some(SubmissionSummary {
            codes: result.len(),
            images: inner.batch.as_ref().map_or(0, |b| b.len()),
        })
    }

    /// Number of preview handles not yet released.
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }

    /// Validate `candidates` and make them the current batch.
    ///
    /// On [`ValidationError::NoImages`](crate::error::ValidationError::NoImages) the
    /// previous batch, result and state are kept. While a submission is in flight the
    /// selection is refused with [`ExtractorError::SubmissionInFlight`].
    pub fn select_files(
        &self,
        candidates: Vec<FileHandle>,
        source: IntakeSource,
    ) -> Result<SelectionSummary> {
        let superseded;
        let summary;
        {
            let mut inner = self.inner.lock();
            if inner.state.is_submitting() {
                tracing::debug!(%source, "Selection refused while a submission is in flight");
                return Err(ExtractorError::SubmissionInFlight);
            }

            let selection = intake::select_files(
                candidates,
                source,
                &self.previews,
                self.config.preview_limit,
            )?;
            summary = selection.summary();

            let next = inner.state.apply(&WorkflowEvent::Selected {
                batch_id: summary.batch_id,
            })?;
            inner.state = next;
            inner.result = None;
            superseded = inner.batch.replace(Arc::new(selection.batch));
        }

        // Releases the old batch's previews unless a caller still holds the Arc.
        if let Some(old) = superseded {
            tracing::debug!(batch_id = %old.id, "Superseded previous batch");
        }

        Ok(summary)
    }

    /// Read `paths` from disk and select them.
    pub async fn select_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<SelectionSummary> {
        let candidates = intake::read_candidates(paths).await?;
        self.select_files(candidates, IntakeSource::Paths)
    }

    /// Upload the current batch and wait for the service's answer.
    ///
    /// # Errors
    /// - [`ExtractorError::Unauthenticated`] when nobody is signed in
    /// - [`ExtractorError::EmptyBatch`] when nothing is selected (no request is made)
    /// - [`ExtractorError::SubmissionInFlight`] when another submission is running;
    ///   nothing changes and no request is made
    /// - [`ExtractorError::InvalidState`] after a completed run; select again first
    /// - [`ExtractorError::Submission`] when the service rejected the batch or could
    ///   not be reached; the state is then `Failed`
    pub async fn submit(&self) -> Result<ExtractionResult> {
        let identity = self.session.require()?;

        let request = {
            let mut inner = self.inner.lock();
            if inner.state.is_submitting() {
                return Err(ExtractorError::SubmissionInFlight);
            }
            let batch = match &inner.batch {
                Some(batch) if !batch.is_empty() => batch.clone(),
                _ => return Err(ExtractorError::EmptyBatch),
            };

            let next = inner.state.apply(&WorkflowEvent::SubmitStarted { batch_id: batch.id })?;
            inner.state = next;
            inner.result = None;

            ExtractionRequest::from_batch(
                &batch,
                &self.config.endpoint,
                &self.config.extract_path,
                &self.config.field_name,
                self.config.timeout_ms,
            )
        };

        tracing::info!(
            batch_id = %request.batch_id,
            images = request.parts.len(),
            user = %identity.email,
            "Submitting batch"
        );

        let mut guard = InterruptGuard {
            inner: &self.inner,
            armed: true,
        };
        let outcome = submit_batch(&self.client, &request).await;
        guard.armed = false;

        let mut inner = self.inner.lock();
        match outcome {
            Ok(result) => {
                let next = inner.state.apply(&WorkflowEvent::SubmitSucceeded {
                    codes: result.len(),
                })?;
                inner.state = next;
                inner.result = Some(result.clone());
                Ok(result)
            }
            Err(error) => {
                let next = inner
                    .state
                    .apply(&WorkflowEvent::SubmitFailed(error.clone()))?;
                inner.state = next;
                Err(error.into())
            }
        }
    }

    /// Dismiss a failure notice and return to `Idle`.
    pub fn acknowledge_failure(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let next = inner.state.apply(&WorkflowEvent::FailureAcknowledged)?;
        inner.state = next;
        Ok(())
    }

    /// Serialize the current result.
    ///
    /// Returns `None` when there is no result or it holds no codes: nothing to
    /// download.
    pub fn export(&self, format: ExportFormat) -> Option<ExportArtifact> {
        let inner = self.inner.lock();
        export_as(inner.result.as_ref()?.codes(), format)
    }
}

/// Moves the workflow out of `Submitting` if the submit future is dropped before
/// the service answers.
struct InterruptGuard<'a> {
    inner: &'a Mutex<WorkflowInner>,
    armed: bool,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        let event = WorkflowEvent::SubmitFailed(SubmissionError::Transport(
            "submission was interrupted".to_string(),
        ));
        if let Ok(next) = inner.state.apply(&event) {
            tracing::warn!("Submission dropped before the service answered");
            inner.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::error::ValidationError;
    use crate::http::MockExtractionClient;

    const KEY: &str = "POST /extract";

    fn session() -> Session {
        Session::signed_in(Identity {
            id: "ops@example.com".to_string(),
            email: "ops@example.com".to_string(),
        })
    }

    fn workflow() -> (MockExtractionClient, Workflow<MockExtractionClient>) {
        let mock = MockExtractionClient::new();
        let workflow = Workflow::new(mock.clone(), ExtractorConfig::default(), session());
        (mock, workflow)
    }

    fn images(names: &[&str]) -> Vec<FileHandle> {
        names
            .iter()
            .map(|name| {
                FileHandle::new(*name, crate::domain::detect_media_type(name), vec![0; 8])
            })
            .collect()
    }

    #[test]
    fn test_new_workflow_is_idle_and_empty() {
        let (_, workflow) = workflow();
        assert_eq!(workflow.state(), ProcessingState::Idle);
        assert!(workflow.batch().is_none());
        assert!(workflow.result().is_none());
        assert!(workflow.summary().is_none());
    }

    #[test]
    fn test_rejected_selection_keeps_previous_batch() {
        let (_, workflow) = workflow();
        let first = workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();

        let err = workflow
            .select_files(images(&["readme.txt"]), IntakeSource::Drop)
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::Validation(ValidationError::NoImages)
        ));
        assert_eq!(workflow.batch().unwrap().id, first.batch_id);
        assert_eq!(workflow.state(), ProcessingState::Idle);
    }

    #[test]
    fn test_reselection_releases_previews() {
        let (_, workflow) = workflow();
        workflow
            .select_files(images(&["a.jpg", "b.png", "c.gif"]), IntakeSource::Picker)
            .unwrap();
        assert_eq!(workflow.live_previews(), 3);

        for _ in 0..5 {
            workflow
                .select_files(images(&["d.jpg", "e.jpg"]), IntakeSource::Drop)
                .unwrap();
        }
        assert_eq!(workflow.live_previews(), 2);
    }

    #[tokio::test]
    async fn test_submit_without_selection_makes_no_request() {
        let (mock, workflow) = workflow();
        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, ExtractorError::EmptyBatch));
        assert_eq!(mock.call_count(), 0);
        assert_eq!(workflow.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_submit_requires_sign_in() {
        let mock = MockExtractionClient::new();
        let workflow = Workflow::new(mock.clone(), ExtractorConfig::default(), Session::new());
        workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();

        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, ExtractorError::Unauthenticated));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_result_and_summary() {
        let (mock, workflow) = workflow();
        mock.add_json_response(KEY, 200, r#"{"codes":["CODE1","CODE2"]}"#);
        workflow
            .select_files(images(&["a.jpg", "b.png", "c.png"]), IntakeSource::Picker)
            .unwrap();

        let result = workflow.submit().await.unwrap();
        assert_eq!(result.codes(), ["CODE1", "CODE2"]);
        assert_eq!(workflow.state().as_str(), "completed");
        assert_eq!(
            workflow.summary().unwrap(),
            SubmissionSummary {
                codes: 2,
                images: 3
            }
        );

        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidState("completed", "submit")));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_new_selection_clears_result() {
        let (mock, workflow) = workflow();
        mock.add_json_response(KEY, 200, r#"{"codes":["CODE1"]}"#);
        workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();
        workflow.submit().await.unwrap();

        workflow
            .select_files(images(&["b.jpg"]), IntakeSource::Picker)
            .unwrap();
        assert_eq!(workflow.state(), ProcessingState::Idle);
        assert!(workflow.result().is_none());
        assert!(workflow.export(ExportFormat::Plain).is_none());
    }

    #[tokio::test]
    async fn test_failure_then_acknowledge() {
        let (mock, workflow) = workflow();
        mock.add_json_response(KEY, 400, r#"{"error":"No images uploaded"}"#);
        workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();

        let err = workflow.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Processing error: No images uploaded");
        assert_eq!(
            workflow.state().failure_reason(),
            Some("No images uploaded")
        );
        assert!(workflow.result().is_none());

        workflow.acknowledge_failure().unwrap();
        assert_eq!(workflow.state(), ProcessingState::Idle);
        assert!(workflow.acknowledge_failure().is_err());
    }

    #[tokio::test]
    async fn test_empty_codes_export_nothing() {
        let (mock, workflow) = workflow();
        mock.add_json_response(KEY, 200, r#"{"codes":[]}"#);
        workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();

        let result = workflow.submit().await.unwrap();
        assert!(result.is_empty());
        assert_eq!(workflow.result(), Some(ExtractionResult::default()));
        for format in ExportFormat::ALL {
            assert!(workflow.export(format).is_none());
        }
    }

    #[tokio::test]
    async fn test_dropped_submission_leaves_failed_state() {
        let (mock, workflow) = workflow();
        let _trigger = mock.add_response_with_trigger(
            KEY,
            Ok(crate::http::HttpResponse {
                status: 200,
                body: r#"{"codes":[]}"#.to_string(),
            }),
        );
        workflow
            .select_files(images(&["a.jpg"]), IntakeSource::Picker)
            .unwrap();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            workflow.submit(),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(
            workflow.state().failure_reason(),
            Some("submission was interrupted")
        );
        assert_eq!(mock.in_flight_count(), 0);
    }
}
