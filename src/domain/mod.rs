//! Core domain types for the extraction workflow.
//!
//! This module contains pure domain types with no I/O dependencies:
//! - File handles and media types
//! - Batches, preview handles and extraction results
//! - The processing state machine

pub mod batch;
pub mod file;
pub mod preview;
pub mod state;
pub mod transitions;

pub use batch::{Batch, BatchId, ExtractionResult, SubmissionSummary};
pub use file::{FileHandle, FileId, detect_media_type};
pub use preview::{PreviewHandle, PreviewId, PreviewRegistry};
pub use state::{ProcessingState, WorkflowEvent};
