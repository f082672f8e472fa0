use super::{Persistence, PersistenceKind, SaveAsOutcome};
use crate::platform::{Dialogs, Downloader, PlatformError};
use crate::session::DEFAULT_FILE_NAME;
use async_trait::async_trait;
use tracing::info;

/// Save-as for platforms without file handles: the document is handed over
/// as a download named after the current file.
pub struct DownloadFallbackPersistence {
    downloader: Box<dyn Downloader>,
}

impl DownloadFallbackPersistence {
    pub fn new(downloader: Box<dyn Downloader>) -> Self {
        Self { downloader }
    }
}

#[async_trait(?Send)]
impl Persistence for DownloadFallbackPersistence {
    fn kind(&self) -> PersistenceKind {
        PersistenceKind::DownloadFallback
    }

    async fn save_as(
        &self,
        content: &str,
        suggested_name: &str,
        _dialogs: &mut dyn Dialogs,
    ) -> Result<SaveAsOutcome, PlatformError> {
        let file_name = if suggested_name.is_empty() {
            DEFAULT_FILE_NAME
        } else {
            suggested_name
        };
        self.downloader.download(content.as_bytes(), file_name);
        // No way to know whether the user kept the file.
        info!(file_name, bytes = content.len(), "offered document as download");
        Ok(SaveAsOutcome::Downloaded)
    }
}
