//! Intake and validation of candidate files.
//!
//! Every intake source (file picker, drop target, paths on the command line) hands
//! its candidates to [`select_files`]; there is no other way to build a
//! [`Batch`].

use std::path::Path;

use serde::Serialize;

use crate::domain::{Batch, BatchId, FileHandle, PreviewRegistry};
use crate::error::{Result, ValidationError};

/// Where a selection came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSource {
    Picker,
    Drop,
    Paths,
}

impl std::fmt::Display for IntakeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeSource::Picker => write!(f, "picker"),
            IntakeSource::Drop => write!(f, "drop"),
            IntakeSource::Paths => write!(f, "paths"),
        }
    }
}

/// A validated selection.
#[derive(Debug)]
pub struct Selection {
    pub batch: Batch,
    /// Number of image files kept
    pub accepted: usize,
    /// Number of candidates dropped for not being images
    pub rejected: usize,
}

impl Selection {
    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            batch_id: self.batch.id,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }
}

/// Counts reported back to the user after a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub batch_id: BatchId,
    pub accepted: usize,
    pub rejected: usize,
}

impl SelectionSummary {
    /// Notice shown after a successful selection.
    pub fn message(&self) -> String {
        format!("{} image(s) ready for processing.", self.accepted)
    }
}

/// Filter `candidates` down to images and build a batch from them.
///
/// Order is preserved. The first `preview_limit` images get a preview handle
/// registered in `previews`; those handles belong to the returned batch.
///
/// # Errors
/// [`ValidationError::NoImages`] when no candidate declares an `image/*` type.
/// Nothing is registered in that case.
pub fn select_files(
    candidates: Vec<FileHandle>,
    source: IntakeSource,
    previews: &PreviewRegistry,
    preview_limit: usize,
) -> std::result::Result<Selection, ValidationError> {
    let total = candidates.len();
    let images: Vec<FileHandle> = candidates.into_iter().filter(FileHandle::is_image).collect();
    let rejected = total - images.len();

    if images.is_empty() {
        tracing::debug!(%source, candidates = total, "Selection contained no images");
        return Err(ValidationError::NoImages);
    }

    let handles = images
        .iter()
        .take(preview_limit)
        .map(|file| previews.create(file))
        .collect();

    let accepted = images.len();
    let batch = Batch::new(images, handles);

    tracing::info!(
        %source,
        batch_id = %batch.id,
        accepted,
        rejected,
        "Selected images"
    );

    Ok(Selection {
        batch,
        accepted,
        rejected,
    })
}

/// Read files from disk as intake candidates.
///
/// Media types are declared from file extensions; validation still happens in
/// [`select_files`].
pub async fn read_candidates<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileHandle>> {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        candidates.push(FileHandle::from_path(path).await?);
    }
    Ok(candidates)
}
