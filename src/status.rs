use std::fmt;

/// Tab stop used when reporting the caret column.
pub const STATUS_TAB_STOP: usize = 4;

pub const APP_NAME: &str = "SimplePad";

/// 1-based caret position as shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub const START: CursorPosition = CursorPosition { line: 1, column: 1 };

    /// Scan `text` from the start up to `offset` characters.
    ///
    /// Characters are Unicode scalar values, so an astral character such as
    /// an emoji is one column, not the two UTF-16 units a browser counts.
    ///
    /// A newline starts a new line at column 1, a tab jumps to the next
    /// multiple of [`STATUS_TAB_STOP`] plus one, anything else advances the
    /// column by one. Offsets past the end are clamped.
    pub fn scan(text: &str, offset: usize) -> Self {
        let mut position = Self::START;
        for ch in text.chars().take(offset) {
            match ch {
                '\n' => {
                    position.line += 1;
                    position.column = 1;
                }
                '\t' => {
                    position.column =
                        (position.column - 1) / STATUS_TAB_STOP * STATUS_TAB_STOP
                            + STATUS_TAB_STOP
                            + 1;
                }
                _ => position.column += 1,
            }
        }
        position
    }
}

impl Default for CursorPosition {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ln {}, Col {}", self.line, self.column)
    }
}

/// Window title: an unsaved marker, the file name and the app name.
pub fn window_title(dirty: bool, file_name: &str) -> String {
    let marker = if dirty { "*" } else { "" };
    format!("{marker}{file_name} - {APP_NAME}")
}
