//! Client-side batch workflow for extracting codes from images.
//!
//! A user selects images, the batch is uploaded in one multipart request to a remote
//! recognition service, and the codes it returns can be exported as plain text or as
//! a comma-separated file. The [`Workflow`] controller owns the batch, the processing
//! state and the result, and guarantees at most one upload in flight at a time.
//!
//! Recognition happens elsewhere: this crate only talks to the service through the
//! [`ExtractionClient`] trait. Sign-in is delegated to a [`CredentialVerifier`].

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod http;
pub mod intake;
pub mod submit;
pub mod workflow;

// Re-export commonly used types
pub use auth::{AllowListVerifier, AuthGate, AuthStatus, CredentialVerifier, Identity, Session};
pub use config::{CredentialEntry, ExtractorConfig};
pub use domain::{
    Batch, BatchId, ExtractionResult, FileHandle, ProcessingState, SubmissionSummary,
};
pub use error::{ExtractorError, Result, SubmissionError, ValidationError};
pub use export::{ExportArtifact, ExportFormat, export_as};
pub use http::{
    ExtractionClient, ExtractionRequest, HttpResponse, MockExtractionClient,
    ReqwestExtractionClient,
};
pub use intake::{IntakeSource, SelectionSummary, select_files};
pub use submit::submit_batch;
pub use workflow::Workflow;
