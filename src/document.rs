/// The text being edited and the caret inside it.
///
/// The caret is a byte offset that always sits on a char boundary. Editing
/// methods return `true` when the text actually changed so callers can tell
/// content edits from no-ops (backspace at the very start, and so on).
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    caret: usize,
    // Column to aim for when moving vertically through shorter lines.
    goal_column: Option<usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            caret: 0,
            goal_column: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole text and put the caret at the start.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.caret = 0;
        self.goal_column = None;
    }

    pub fn clear(&mut self) {
        self.set_text(String::new());
    }

    /// Caret offset in bytes.
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Caret offset counted in characters from the start of the text.
    pub fn caret_char_offset(&self) -> usize {
        self.text[..self.caret].chars().count()
    }

    pub fn set_caret_char_offset(&mut self, offset: usize) {
        self.caret = self
            .text
            .char_indices()
            .nth(offset)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len());
        self.goal_column = None;
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Zero-based line index of the caret.
    pub fn caret_line(&self) -> usize {
        self.text[..self.caret].matches('\n').count()
    }

    /// Text of the caret's line before the caret.
    pub fn text_before_caret_on_line(&self) -> &str {
        &self.text[self.line_start(self.caret)..self.caret]
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text[pos..]
            .find('\n')
            .map(|idx| pos + idx)
            .unwrap_or(self.text.len())
    }

    fn column_chars(&self, pos: usize) -> usize {
        self.text[self.line_start(pos)..pos].chars().count()
    }

    /// Byte offset `column` chars into the line starting at `start`, clamped
    /// to the end of that line.
    fn offset_in_line(&self, start: usize, column: usize) -> usize {
        let end = self.line_end(start);
        self.text[start..end]
            .char_indices()
            .nth(column)
            .map(|(idx, _)| start + idx)
            .unwrap_or(end)
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.text.insert(self.caret, ch);
        self.caret += ch.len_utf8();
        self.goal_column = None;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.insert_char('\n')
    }

    pub fn insert_str(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.text.insert_str(self.caret, text);
        self.caret += text.len();
        self.goal_column = None;
        true
    }

    pub fn delete_backward(&mut self) -> bool {
        let Some(ch) = self.text[..self.caret].chars().next_back() else {
            return false;
        };
        self.caret -= ch.len_utf8();
        self.text.remove(self.caret);
        self.goal_column = None;
        true
    }

    pub fn delete_forward(&mut self) -> bool {
        if self.caret >= self.text.len() {
            return false;
        }
        self.text.remove(self.caret);
        self.goal_column = None;
        true
    }

    pub fn move_left(&mut self) {
        if let Some(ch) = self.text[..self.caret].chars().next_back() {
            self.caret -= ch.len_utf8();
        }
        self.goal_column = None;
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.text[self.caret..].chars().next() {
            self.caret += ch.len_utf8();
        }
        self.goal_column = None;
    }

    pub fn move_up(&mut self, lines: usize) {
        let goal = self.goal_column.unwrap_or_else(|| self.column_chars(self.caret));
        let mut start = self.line_start(self.caret);
        for _ in 0..lines {
            if start == 0 {
                break;
            }
            start = self.line_start(start - 1);
        }
        self.caret = self.offset_in_line(start, goal);
        self.goal_column = Some(goal);
    }

    pub fn move_down(&mut self, lines: usize) {
        let goal = self.goal_column.unwrap_or_else(|| self.column_chars(self.caret));
        let mut start = self.line_start(self.caret);
        for _ in 0..lines {
            let end = self.line_end(start);
            if end >= self.text.len() {
                break;
            }
            start = end + 1;
        }
        self.caret = self.offset_in_line(start, goal);
        self.goal_column = Some(goal);
    }

    pub fn move_line_start(&mut self) {
        self.caret = self.line_start(self.caret);
        self.goal_column = None;
    }

    pub fn move_line_end(&mut self) {
        self.caret = self.line_end(self.caret);
        self.goal_column = None;
    }

    pub fn move_document_start(&mut self) {
        self.caret = 0;
        self.goal_column = None;
    }

    pub fn move_document_end(&mut self) {
        self.caret = self.text.len();
        self.goal_column = None;
    }
}
