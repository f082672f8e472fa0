//! Terminal input, and the dialogs that take over the bottom line.

use super::view::{TAB_STOP, visible_segment};
use crate::platform::Dialogs;
use async_trait::async_trait;
use crossterm::{
    cursor,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType, size},
};
use futures::StreamExt;
use std::io::{self, Write, stdout};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Editing,
    Submit,
    Cancel,
}

/// Single-line text entry used by the prompt dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    text: String,
    cursor: usize,
}

impl LineInput {
    pub fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
            cursor: initial.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }

    pub fn handle(&mut self, key: &KeyEvent) -> InputStatus {
        if key.kind == KeyEventKind::Release {
            return InputStatus::Editing;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return InputStatus::Submit,
            KeyCode::Esc => return InputStatus::Cancel,
            KeyCode::Char('c') if ctrl => return InputStatus::Cancel,
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char(c) if !ctrl => {
                let at = self.byte_index(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
            }
            KeyCode::Delete if self.cursor < self.text.chars().count() => {
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.text.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.chars().count(),
            _ => {}
        }
        InputStatus::Editing
    }
}

/// Answer to a yes/no question, `None` for keys that are not an answer.
pub fn confirm_answer(key: &KeyEvent) -> Option<bool> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}

pub struct Terminal {
    events: EventStream,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            events: EventStream::new(),
        }
    }

    /// Next terminal event. `None` once input is closed.
    pub async fn next_event(&mut self) -> io::Result<Option<Event>> {
        self.events.next().await.transpose()
    }

    async fn next_key(&mut self) -> Option<KeyEvent> {
        loop {
            match self.next_event().await {
                Ok(Some(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                    return Some(key);
                }
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(err) => {
                    warn!(%err, "terminal input failed");
                    return None;
                }
            }
        }
    }

    fn draw_bottom_line(&self, text: &str, cursor_col: Option<usize>) -> io::Result<()> {
        let mut out = stdout();
        let (width, height) = size()?;
        let row = height.saturating_sub(1);
        let clipped: String = text.chars().take(usize::from(width)).collect();
        queue!(
            out,
            cursor::MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            SetAttribute(Attribute::Bold),
            Print(&clipped),
            SetAttribute(Attribute::Reset)
        )?;
        match cursor_col {
            Some(col) => queue!(out, cursor::MoveTo(col.min(usize::from(width)) as u16, row), cursor::Show)?,
            None => queue!(out, cursor::Hide)?,
        }
        out.flush()
    }

    /// Show `text` full screen until a key is pressed.
    pub async fn show_page(&mut self, text: &str) -> io::Result<()> {
        let mut out = stdout();
        let (width, height) = size()?;
        let rows = usize::from(height).saturating_sub(1);
        queue!(out, Clear(ClearType::All), cursor::Hide)?;
        for (row, line) in text.lines().take(rows).enumerate() {
            let shown = visible_segment(line, TAB_STOP, 0, usize::from(width));
            queue!(out, cursor::MoveTo(0, row as u16), Print(shown))?;
        }
        self.draw_bottom_line("Press any key to return", None)?;
        self.next_key().await;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Dialogs for Terminal {
    async fn confirm(&mut self, message: &str) -> bool {
        debug!(text = message, "confirm dialog");
        let text = format!("{message} (y/n)");
        if let Err(err) = self.draw_bottom_line(&text, Some(text.width() + 1)) {
            warn!(%err, "failed to draw dialog");
        }
        while let Some(key) = self.next_key().await {
            if let Some(answer) = confirm_answer(&key) {
                return answer;
            }
        }
        false
    }

    async fn alert(&mut self, message: &str) {
        debug!(text = message, "alert dialog");
        let text = format!("{message} [press any key]");
        if let Err(err) = self.draw_bottom_line(&text, None) {
            warn!(%err, "failed to draw dialog");
        }
        self.next_key().await;
    }

    async fn prompt(&mut self, message: &str, initial: &str) -> Option<String> {
        debug!(text = message, "prompt dialog");
        let mut input = LineInput::new(initial);
        loop {
            let before_cursor: String = input.text().chars().take(input.cursor()).collect();
            let text = format!("{message} {}", input.text());
            let col = message.width() + 1 + before_cursor.width();
            if let Err(err) = self.draw_bottom_line(&text, Some(col)) {
                warn!(%err, "failed to draw dialog");
            }

            let key = self.next_key().await?;
            match input.handle(&key) {
                InputStatus::Editing => {}
                InputStatus::Submit => return Some(input.text().to_string()),
                InputStatus::Cancel => return None,
            }
        }
    }
}
