//! Collaborators the editor session talks to.
//!
//! The session never touches the filesystem or the terminal directly. It goes
//! through these traits, which [`native`] implements for the real program and
//! `crate::testing` fakes for unit tests.

pub mod native;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Stream already closed")]
    StreamClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Blocking user interaction: confirmation, alerts and a single-line prompt.
#[async_trait(?Send)]
pub trait Dialogs {
    async fn confirm(&mut self, message: &str) -> bool;

    async fn alert(&mut self, message: &str);

    /// Ask for a line of text. `None` means the user dismissed the prompt.
    async fn prompt(&mut self, message: &str, initial: &str) -> Option<String>;
}

/// A file chosen by the user and read in full. Never writable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[async_trait(?Send)]
pub trait FileSelector {
    /// Let the user pick a file and read it. `Ok(None)` when they cancel.
    async fn select(&self, dialogs: &mut dyn Dialogs) -> Result<Option<SelectedFile>, PlatformError>;
}

/// An open write session on a [`FileHandle`]. Data becomes visible at the
/// destination only once [`close`](WritableFileStream::close) succeeds.
#[async_trait(?Send)]
pub trait WritableFileStream: std::fmt::Debug {
    async fn write(&mut self, data: &[u8]) -> Result<(), PlatformError>;

    async fn close(self: Box<Self>) -> Result<(), PlatformError>;
}

/// A capability to write a specific storage location again without asking.
#[async_trait(?Send)]
pub trait FileHandle: std::fmt::Debug {
    fn name(&self) -> &str;

    /// Whether this handle can still hand out exclusive writers at all.
    fn supports_writable(&self) -> bool;

    async fn create_writable(&self) -> Result<Box<dyn WritableFileStream>, PlatformError>;
}

/// Write `data` through a fresh stream on `handle` and close it.
pub async fn write_via_handle(handle: &dyn FileHandle, data: &[u8]) -> Result<(), PlatformError> {
    let mut stream = handle.create_writable().await?;
    stream.write(data).await?;
    stream.close().await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    pub description: String,
    pub mime: String,
    pub extensions: Vec<String>,
}

impl FileType {
    pub fn plain_text() -> Self {
        Self {
            description: "Text Files".to_string(),
            mime: "text/plain".to_string(),
            extensions: vec![".txt".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePickerOptions {
    pub suggested_name: String,
    pub types: Vec<FileType>,
}

#[async_trait(?Send)]
pub trait SaveFilePicker {
    /// Ask for a destination and return a handle to it. `Ok(None)` when the
    /// user cancels.
    async fn show_save_file_picker(
        &self,
        dialogs: &mut dyn Dialogs,
        options: &SavePickerOptions,
    ) -> Result<Option<Box<dyn FileHandle>>, PlatformError>;
}

/// Hands a blob to the user as a download. There is no completion signal.
pub trait Downloader {
    fn download(&self, blob: &[u8], file_name: &str);
}

/// How the user wants documents persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    #[default]
    Auto,
    Handle,
    Download,
}

impl PersistenceMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "handle" => Some(Self::Handle),
            "download" => Some(Self::Download),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Handle => "handle",
            Self::Download => "download",
        }
    }
}

/// What the platform can do, probed once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub save_file_picker: bool,
}

impl Capabilities {
    pub fn detect(mode: PersistenceMode) -> Self {
        let save_file_picker = !matches!(mode, PersistenceMode::Download);
        info!(mode = mode.name(), save_file_picker, "detected platform capabilities");
        Self { save_file_picker }
    }
}
