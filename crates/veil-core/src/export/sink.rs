//! Persistence boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ExportedFile;

/// Where an export goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditTarget {
    /// Replace the image at an existing slot.
    Existing(usize),
    /// Upload as a new image.
    #[default]
    New,
}

impl EditTarget {
    /// Interpret a host slot index, where any negative value means "new".
    pub fn from_slot(index: i64) -> Self {
        usize::try_from(index).map_or(EditTarget::New, EditTarget::Existing)
    }
}

/// Errors reported by a persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// The service refused the image
    #[error("Image rejected: {0}")]
    Rejected(String),

    /// The service could not be reached
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

/// Receives flattened images.
///
/// Exactly one of the two methods is called per successful export.
#[allow(async_fn_in_trait)]
pub trait ImageSink {
    /// Replace the image stored at `index`.
    async fn replace(&mut self, index: usize, file: ExportedFile) -> Result<(), PersistError>;

    /// Store the image as a new entry.
    async fn upload(&mut self, file: ExportedFile) -> Result<(), PersistError>;
}

/// Route a file to the sink method matching `target`.
pub async fn deliver<S: ImageSink>(
    sink: &mut S,
    target: EditTarget,
    file: ExportedFile,
) -> Result<(), PersistError> {
    match target {
        EditTarget::Existing(index) => sink.replace(index, file).await,
        EditTarget::New => sink.upload(file).await,
    }
}
