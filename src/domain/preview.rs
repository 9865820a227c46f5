//! Preview handles for selected images.
//!
//! A preview stands in for whatever the front end renders as a thumbnail (an object
//! URL, a decoded texture). Handles are owned by the [`Batch`](super::batch::Batch)
//! they were created for and unregister themselves when dropped, so replacing a batch
//! releases every preview of the old one.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use super::file::{FileHandle, FileId};

/// Unique identifier for a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PreviewId(pub Uuid);

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Tracks which previews are currently alive.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<PreviewId>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `file`. The preview lives as long as the returned handle.
    pub fn create(&self, file: &FileHandle) -> PreviewHandle {
        let id = PreviewId(Uuid::new_v4());
        self.live.lock().insert(id);
        PreviewHandle {
            id,
            file_id: file.id,
            name: file.name.clone(),
            live: self.live.clone(),
        }
    }

    /// Number of previews that have not been released yet.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, id: PreviewId) -> bool {
        self.live.lock().contains(&id)
    }
}

/// Owned preview resource; released on drop.
pub struct PreviewHandle {
    id: PreviewId,
    file_id: FileId,
    name: String,
    live: Arc<Mutex<HashSet<PreviewId>>>,
}

impl PreviewHandle {
    pub fn id(&self) -> PreviewId {
        self.id
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// File name shown under the thumbnail.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("file_id", &self.file_id)
            .field("name", &self.name)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.live.lock().remove(&self.id);
        tracing::trace!(preview_id = %self.id, file = %self.name, "Released preview");
    }
}
