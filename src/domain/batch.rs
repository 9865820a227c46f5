//! Batch and extraction result types.
//!
//! A batch is the validated set of images a user selected. It is built only by
//! intake, replaced wholesale on every new selection, and submitted as one request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::file::FileHandle;
use super::preview::PreviewHandle;

/// Unique identifier for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl From<Uuid> for BatchId {
    fn from(uuid: Uuid) -> Self {
        BatchId(uuid)
    }
}

impl std::ops::Deref for BatchId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// An ordered, non-empty set of image files.
///
/// Every file's media type starts with `image/`. Preview handles created for the
/// batch are owned here and released when the batch is dropped.
#[derive(Debug)]
pub struct Batch {
    pub id: BatchId,
    pub created_at: DateTime<Utc>,
    files: Vec<FileHandle>,
    previews: Vec<PreviewHandle>,
}

impl Batch {
    /// Intake is the only caller; it has already checked the invariants.
    pub(crate) fn new(files: Vec<FileHandle>, previews: Vec<PreviewHandle>) -> Self {
        debug_assert!(!files.is_empty());
        debug_assert!(files.iter().all(FileHandle::is_image));
        Self {
            id: BatchId(Uuid::new_v4()),
            created_at: Utc::now(),
            files,
            previews,
        }
    }

    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    pub fn previews(&self) -> &[PreviewHandle] {
        &self.previews
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    /// Total payload size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(FileHandle::size).sum()
    }
}

/// Codes returned by the recognition service, in service order.
///
/// An empty result is a successful run that found nothing; "not run yet" is
/// represented by the absence of a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult(Vec<String>);

impl ExtractionResult {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn into_codes(self) -> Vec<String> {
        self.0
    }
}

impl std::ops::Deref for ExtractionResult {
    type Target = [String];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for ExtractionResult {
    fn from(codes: Vec<String>) -> Self {
        Self(codes)
    }
}

/// Counts reported after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    pub codes: usize,
    pub images: usize,
}

impl std::fmt::Display for SubmissionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} code(s) from {} image(s).",
            self.codes, self.images
        )
    }
}
