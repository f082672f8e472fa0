//! Filesystem-backed collaborators for the terminal program.

use super::{
    Capabilities, Dialogs, Downloader, FileHandle, FileSelector, PlatformError, SaveFilePicker,
    SavePickerOptions, SelectedFile, WritableFileStream,
};
use crate::persistence::{DownloadFallbackPersistence, HandleBackedPersistence, Persistence};
use async_trait::async_trait;
use std::fs::Permissions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Build the one persistence strategy this run will use.
pub fn persistence(
    capabilities: Capabilities,
    base_dir: &Path,
    download_dir: &Path,
) -> Box<dyn Persistence> {
    let strategy: Box<dyn Persistence> = if capabilities.save_file_picker {
        Box::new(HandleBackedPersistence::new(Box::new(PromptSavePicker::new(
            base_dir,
        ))))
    } else {
        Box::new(DownloadFallbackPersistence::new(Box::new(
            DirectoryDownloader::new(download_dir),
        )))
    };
    info!(strategy = strategy.kind().name(), "selected persistence strategy");
    strategy
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a whole file the way the open dialog does.
pub async fn read_file(path: &Path) -> Result<SelectedFile, PlatformError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| match err.kind() {
        ErrorKind::NotFound => PlatformError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => PlatformError::PermissionDenied(path.display().to_string()),
        _ => PlatformError::Io(err),
    })?;
    Ok(SelectedFile {
        name: file_name_of(path),
        bytes,
    })
}

/// Asks for a path on the prompt line and reads the file.
#[derive(Debug, Clone)]
pub struct PromptFileSelector {
    base_dir: PathBuf,
}

impl PromptFileSelector {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait(?Send)]
impl FileSelector for PromptFileSelector {
    async fn select(&self, dialogs: &mut dyn Dialogs) -> Result<Option<SelectedFile>, PlatformError> {
        let Some(answer) = dialogs.prompt("Open file:", "").await else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        read_file(&self.base_dir.join(answer)).await.map(Some)
    }
}

/// Asks for a destination path on the prompt line.
#[derive(Debug, Clone)]
pub struct PromptSavePicker {
    base_dir: PathBuf,
}

impl PromptSavePicker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait(?Send)]
impl SaveFilePicker for PromptSavePicker {
    async fn show_save_file_picker(
        &self,
        dialogs: &mut dyn Dialogs,
        options: &SavePickerOptions,
    ) -> Result<Option<Box<dyn FileHandle>>, PlatformError> {
        let Some(answer) = dialogs.prompt("Save as:", &options.suggested_name).await else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }

        let mut path = self.base_dir.join(answer);
        if path.extension().is_none() {
            let default_ext = options
                .types
                .iter()
                .flat_map(|file_type| file_type.extensions.iter())
                .next();
            if let Some(ext) = default_ext {
                path.set_extension(ext.trim_start_matches('.'));
            }
        }

        if tokio::fs::try_exists(&path).await? {
            let question = format!("{} already exists. Replace it?", file_name_of(&path));
            if !dialogs.confirm(&question).await {
                return Ok(None);
            }
        }

        Ok(Some(Box::new(NativeFileHandle::new(path))))
    }
}

/// A file on disk the user has chosen to write to.
#[derive(Debug, Clone)]
pub struct NativeFileHandle {
    path: PathBuf,
    name: String,
}

impl NativeFileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait(?Send)]
impl FileHandle for NativeFileHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_writable(&self) -> bool {
        true
    }

    async fn create_writable(&self) -> Result<Box<dyn WritableFileStream>, PlatformError> {
        // Write through symlinks to the file they point at.
        let target = match tokio::fs::canonicalize(&self.path).await {
            Ok(resolved) => resolved,
            Err(err) if err.kind() == ErrorKind::NotFound => self.path.clone(),
            Err(err) => return Err(err.into()),
        };
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !tokio::fs::try_exists(&dir).await? {
            return Err(PlatformError::NotFound(dir));
        }

        let permissions = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.permissions().readonly() => {
                return Err(PlatformError::PermissionDenied(self.path.display().to_string()));
            }
            Ok(meta) => Some(meta.permissions()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let temp = NamedTempFile::new_in(&dir).map_err(|err| match err.kind() {
            ErrorKind::PermissionDenied => PlatformError::PermissionDenied(dir.display().to_string()),
            _ => PlatformError::Io(err),
        })?;

        Ok(Box::new(NativeWritableStream {
            temp: Some(temp),
            target,
            permissions,
        }))
    }
}

/// Writes land in a temp file next to the target and replace it on close.
///
/// The writes are plain blocking calls; the editor runs on a current-thread
/// runtime and waits for the save to finish either way.
#[derive(Debug)]
pub struct NativeWritableStream {
    temp: Option<NamedTempFile>,
    target: PathBuf,
    // Mode of the file being replaced, carried over on close.
    permissions: Option<Permissions>,
}

#[async_trait(?Send)]
impl WritableFileStream for NativeWritableStream {
    async fn write(&mut self, data: &[u8]) -> Result<(), PlatformError> {
        let temp = self.temp.as_mut().ok_or(PlatformError::StreamClosed)?;
        temp.as_file_mut().write_all(data)?;
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> Result<(), PlatformError> {
        let mut temp = self.temp.take().ok_or(PlatformError::StreamClosed)?;
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        if let Some(permissions) = self.permissions.take() {
            std::fs::set_permissions(temp.path(), permissions)?;
        }
        temp.persist(&self.target).map_err(|err| PlatformError::Io(err.error))?;
        Ok(())
    }
}

/// Drops downloads into a directory, never overwriting an existing file.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `name.txt`, then `name (1).txt`, `name (2).txt`, ...
    fn free_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}){ext}")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(candidate)
    }
}

impl Downloader for DirectoryDownloader {
    fn download(&self, blob: &[u8], file_name: &str) {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!(%err, dir = %self.dir.display(), "download directory unavailable");
            return;
        }
        let target = self.free_path(file_name);
        match std::fs::write(&target, blob) {
            Ok(()) => info!(path = %target.display(), "download written"),
            Err(err) => warn!(%err, path = %target.display(), "download failed"),
        }
    }
}
