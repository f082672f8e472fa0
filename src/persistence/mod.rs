//! Save-as strategies.
//!
//! One strategy is picked at start-up from the detected
//! [`Capabilities`](crate::platform::Capabilities) and kept for the life of the
//! session: either the platform can hand out writable file handles, or the
//! document is offered as a download.

mod download;
mod handle;

pub use download::DownloadFallbackPersistence;
pub use handle::HandleBackedPersistence;

use crate::platform::{Dialogs, FileHandle, PlatformError};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceKind {
    HandleBacked,
    DownloadFallback,
}

impl PersistenceKind {
    pub fn name(&self) -> &'static str {
        match self {
            PersistenceKind::HandleBacked => "handle-backed",
            PersistenceKind::DownloadFallback => "download-fallback",
        }
    }
}

#[derive(Debug)]
pub enum SaveAsOutcome {
    /// Written through a new handle the session should adopt.
    Saved(Box<dyn FileHandle>),
    /// Offered as a download; completion is unknown.
    Downloaded,
    /// The user dismissed the picker.
    Cancelled,
}

#[async_trait(?Send)]
pub trait Persistence {
    fn kind(&self) -> PersistenceKind;

    async fn save_as(
        &self,
        content: &str,
        suggested_name: &str,
        dialogs: &mut dyn Dialogs,
    ) -> Result<SaveAsOutcome, PlatformError>;
}
