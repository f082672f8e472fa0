use crate::document::Document;
use crate::persistence::{Persistence, SaveAsOutcome};
use crate::platform::{Dialogs, FileHandle, FileSelector, SelectedFile, write_via_handle};
use crate::status::{CursorPosition, window_title};
use tracing::{debug, error, info, warn};

pub const DEFAULT_FILE_NAME: &str = "Untitled.txt";

const DISCARD_PROMPT: &str = "Discard unsaved changes?";
const DISCARD_BEFORE_OPEN_PROMPT: &str = "Discard unsaved changes before opening?";
const READ_ERROR_ALERT: &str = "Error reading file.";
const SAVE_ERROR_ALERT: &str = "Error saving file.";

/// Name of the current file and, when it was reached through a writable
/// handle, the handle itself.
#[derive(Debug)]
pub struct FileIdentity {
    pub name: String,
    pub handle: Option<Box<dyn FileHandle>>,
}

impl Default for FileIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_FILE_NAME.to_string(),
            handle: None,
        }
    }
}

/// A content edit coming from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    InsertText(String),
    Newline,
    DeleteBackward,
    DeleteForward,
}

/// A caret movement coming from the UI. Never changes content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up(usize),
    Down(usize),
    LineStart,
    LineEnd,
    DocumentStart,
    DocumentEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadDecision {
    Allow,
    Prompt,
}

/// What an operation did, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    Declined,
    Cancelled,
    Failed,
}

/// One editing session: the document, whether it has unsaved changes and
/// where it is persisted.
pub struct EditorSession {
    document: Document,
    dirty: bool,
    file: FileIdentity,
    persistence: Box<dyn Persistence>,
    selector: Box<dyn FileSelector>,
}

impl EditorSession {
    pub fn new(persistence: Box<dyn Persistence>, selector: Box<dyn FileSelector>) -> Self {
        info!(strategy = persistence.kind().name(), "editor session started");
        Self {
            document: Document::new(),
            dirty: false,
            file: FileIdentity::default(),
            persistence,
            selector,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn file_name(&self) -> &str {
        &self.file.name
    }

    pub fn has_handle(&self) -> bool {
        self.file.handle.is_some()
    }

    pub fn title(&self) -> String {
        window_title(self.dirty, &self.file.name)
    }

    /// Recompute the caret's line and column from the start of the text.
    pub fn cursor_position(&self) -> CursorPosition {
        CursorPosition::scan(self.document.text(), self.document.caret_char_offset())
    }

    pub fn apply_edit(&mut self, edit: Edit) -> bool {
        let changed = match edit {
            Edit::Insert(ch) => self.document.insert_char(ch),
            Edit::InsertText(text) => self.document.insert_str(&text),
            Edit::Newline => self.document.insert_newline(),
            Edit::DeleteBackward => self.document.delete_backward(),
            Edit::DeleteForward => self.document.delete_forward(),
        };
        if changed {
            self.dirty = true;
        }
        changed
    }

    pub fn apply_motion(&mut self, motion: Motion) {
        match motion {
            Motion::Left => self.document.move_left(),
            Motion::Right => self.document.move_right(),
            Motion::Up(lines) => self.document.move_up(lines),
            Motion::Down(lines) => self.document.move_down(lines),
            Motion::LineStart => self.document.move_line_start(),
            Motion::LineEnd => self.document.move_line_end(),
            Motion::DocumentStart => self.document.move_document_start(),
            Motion::DocumentEnd => self.document.move_document_end(),
        }
    }

    pub fn before_unload(&self) -> UnloadDecision {
        if self.dirty {
            UnloadDecision::Prompt
        } else {
            UnloadDecision::Allow
        }
    }

    async fn may_discard(&self, dialogs: &mut dyn Dialogs, message: &str) -> bool {
        !self.dirty || dialogs.confirm(message).await
    }

    pub async fn new_document(&mut self, dialogs: &mut dyn Dialogs) -> Outcome {
        if !self.may_discard(dialogs, DISCARD_PROMPT).await {
            return Outcome::Declined;
        }
        self.document.clear();
        self.file = FileIdentity::default();
        self.dirty = false;
        debug!("started new document");
        Outcome::Done(format!("New file \"{}\"", self.file.name))
    }

    pub async fn open_document(&mut self, dialogs: &mut dyn Dialogs) -> Outcome {
        if !self.may_discard(dialogs, DISCARD_BEFORE_OPEN_PROMPT).await {
            return Outcome::Declined;
        }
        match self.selector.select(dialogs).await {
            Ok(Some(file)) => self.load(file),
            Ok(None) => Outcome::Cancelled,
            Err(err) => {
                error!(%err, "file reading error");
                dialogs.alert(READ_ERROR_ALERT).await;
                Outcome::Failed
            }
        }
    }

    /// Replace the document with a file read from outside. Reads never carry
    /// a writable handle, so any previous one is dropped.
    pub fn load(&mut self, file: SelectedFile) -> Outcome {
        let text = String::from_utf8_lossy(&file.bytes).into_owned();
        self.document.set_text(text);
        self.file = FileIdentity {
            name: file.name,
            handle: None,
        };
        self.dirty = false;
        info!(name = %self.file.name, bytes = file.bytes.len(), "opened file");
        Outcome::Done(format!("\"{}\" {}B read", self.file.name, file.bytes.len()))
    }

    pub async fn save(&mut self, dialogs: &mut dyn Dialogs) -> Outcome {
        let Some(handle) = self.file.handle.as_deref().filter(|h| h.supports_writable()) else {
            return self.save_as(dialogs).await;
        };

        match write_via_handle(handle, self.document.text().as_bytes()).await {
            Ok(()) => {
                self.dirty = false;
                info!(name = handle.name(), "saved through existing handle");
                Outcome::Done(format!(
                    "\"{}\" {}B written",
                    self.file.name,
                    self.document.text().len()
                ))
            }
            Err(err) => {
                warn!(%err, "error saving file with handle, falling back to save as");
                self.save_as(dialogs).await
            }
        }
    }

    pub async fn save_as(&mut self, dialogs: &mut dyn Dialogs) -> Outcome {
        let result = self
            .persistence
            .save_as(self.document.text(), &self.file.name, dialogs)
            .await;

        match result {
            Ok(SaveAsOutcome::Saved(handle)) => {
                self.file = FileIdentity {
                    name: handle.name().to_string(),
                    handle: Some(handle),
                };
                self.dirty = false;
                Outcome::Done(format!(
                    "\"{}\" {}B written",
                    self.file.name,
                    self.document.text().len()
                ))
            }
            Ok(SaveAsOutcome::Downloaded) => {
                // Assumed saved even though the download may never complete.
                self.file.handle = None;
                self.dirty = false;
                Outcome::Done(format!("\"{}\" downloaded", self.file.name))
            }
            Ok(SaveAsOutcome::Cancelled) => Outcome::Cancelled,
            Err(err) => {
                error!(%err, "error saving file with save as");
                dialogs.alert(SAVE_ERROR_ALERT).await;
                Outcome::Failed
            }
        }
    }
}
