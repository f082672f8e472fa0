use crate::document::Document;
use crate::status::CursorPosition;
use crossterm::{
    cursor, execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType, SetTitle, size},
};
use std::io::{self, Write, stdout};
use unicode_width::UnicodeWidthChar;

pub const TAB_STOP: usize = 4;

/// How a single non-tab character is drawn: control characters get caret
/// notation so they cannot move the terminal cursor.
fn cell(ch: char) -> (String, usize) {
    if ch.is_control() {
        let shown = char::from_u32((ch as u32) ^ 0x40).unwrap_or('?');
        (format!("^{shown}"), 2)
    } else {
        (ch.to_string(), ch.width().unwrap_or(1))
    }
}

/// Display column reached after drawing `text` from column 0.
pub fn display_width(text: &str, tab_stop: usize) -> usize {
    text.chars().fold(0, |col, ch| match ch {
        '\t' => (col / tab_stop + 1) * tab_stop,
        _ => col + cell(ch).1,
    })
}

/// Draw `line` with tabs expanded, keeping only display columns
/// `[start, start + width)`. Wide characters straddling either edge are
/// replaced with spaces.
pub fn visible_segment(line: &str, tab_stop: usize, start: usize, width: usize) -> String {
    let end = start + width;
    let mut out = String::new();
    let mut col = 0;
    for ch in line.chars() {
        if col >= end {
            break;
        }
        let (shown, cells) = match ch {
            '\t' => {
                let next = (col / tab_stop + 1) * tab_stop;
                (" ".repeat(next - col), next - col)
            }
            _ => cell(ch),
        };
        let next = col + cells;
        if col >= start && next <= end {
            out.push_str(&shown);
        } else if next > start {
            let overlap = next.min(end) - col.max(start);
            out.push_str(&" ".repeat(overlap));
        }
        col = next;
    }
    out
}

pub fn gutter_width(line_count: usize) -> usize {
    (line_count.to_string().len() + 1).max(4)
}

/// Bottom bar: message on the left, caret position on the right.
pub fn status_line(message: &str, position: CursorPosition, width: usize) -> String {
    let right = position.to_string();
    let room = width.saturating_sub(right.len() + 1);
    let left: String = message.chars().take(room).collect();
    let padding = width.saturating_sub(display_width(&left, TAB_STOP) + right.len());
    let mut line = format!("{left}{}{right}", " ".repeat(padding));
    if line.len() > width {
        line = line.chars().skip(line.chars().count().saturating_sub(width)).collect();
    }
    line
}

pub struct View {
    last_lines: Vec<String>,
    last_status: String,
    last_title: String,
    last_terminal_size: (u16, u16),
    scroll_offset: usize,
    horizontal_scroll: usize,
    needs_full_redraw: bool,
    show_line_numbers: bool,
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    pub fn new() -> Self {
        Self {
            last_lines: Vec::new(),
            last_status: String::new(),
            last_title: String::new(),
            last_terminal_size: (0, 0),
            scroll_offset: 0,
            horizontal_scroll: 0,
            needs_full_redraw: true,
            show_line_numbers: false,
        }
    }

    pub fn set_line_numbers(&mut self, show: bool) {
        if self.show_line_numbers != show {
            self.show_line_numbers = show;
            self.needs_full_redraw = true;
        }
    }

    pub fn force_redraw(&mut self) {
        self.needs_full_redraw = true;
    }

    /// Rows available for text, which is what a page is.
    pub fn text_rows(&self) -> usize {
        let (_, height) = size().unwrap_or((80, 24));
        usize::from(height).saturating_sub(1)
    }

    fn adjust_scroll(&mut self, caret_line: usize, caret_col: usize, rows: usize, cols: usize) {
        if caret_line < self.scroll_offset {
            self.scroll_offset = caret_line;
        } else if rows > 0 && caret_line >= self.scroll_offset + rows {
            self.scroll_offset = caret_line + 1 - rows;
        }

        if caret_col < self.horizontal_scroll {
            self.horizontal_scroll = caret_col;
        } else if cols > 0 && caret_col >= self.horizontal_scroll + cols {
            self.horizontal_scroll = caret_col + 1 - cols;
        }
    }

    pub fn render(
        &mut self,
        document: &Document,
        position: CursorPosition,
        title: &str,
        message: &str,
    ) -> io::Result<()> {
        let mut out = stdout();
        let (width, height) = size()?;
        let (width, height) = (usize::from(width), usize::from(height));

        if self.last_terminal_size != (width as u16, height as u16) {
            self.last_terminal_size = (width as u16, height as u16);
            self.needs_full_redraw = true;
        }

        if self.last_title != title {
            execute!(out, SetTitle(title))?;
            self.last_title = title.to_string();
        }

        let gutter = if self.show_line_numbers {
            gutter_width(document.line_count())
        } else {
            0
        };
        let rows = height.saturating_sub(1);
        let cols = width.saturating_sub(gutter).max(1);

        let caret_line = document.caret_line();
        let caret_col = display_width(document.text_before_caret_on_line(), TAB_STOP);
        let (old_scroll, old_hscroll) = (self.scroll_offset, self.horizontal_scroll);
        self.adjust_scroll(caret_line, caret_col, rows, cols);
        if (old_scroll, old_hscroll) != (self.scroll_offset, self.horizontal_scroll) {
            self.needs_full_redraw = true;
        }

        if self.needs_full_redraw {
            queue!(out, Clear(ClearType::All))?;
            self.last_lines.clear();
            self.last_status.clear();
            self.needs_full_redraw = false;
        }

        let visible: Vec<String> = document
            .lines()
            .skip(self.scroll_offset)
            .take(rows)
            .enumerate()
            .map(|(i, line)| {
                let number = if self.show_line_numbers {
                    format!("{:>w$} ", self.scroll_offset + i + 1, w = gutter - 1)
                } else {
                    String::new()
                };
                let text = visible_segment(line, TAB_STOP, self.horizontal_scroll, cols);
                format!("{number}{text}")
            })
            .collect();

        for row in 0..rows {
            let line = visible.get(row).map(String::as_str).unwrap_or("");
            if self.last_lines.get(row).map(String::as_str) == Some(line) {
                continue;
            }
            queue!(
                out,
                cursor::MoveTo(0, row as u16),
                Clear(ClearType::CurrentLine),
                Print(line)
            )?;
        }
        self.last_lines = (0..rows)
            .map(|row| visible.get(row).cloned().unwrap_or_default())
            .collect();

        let status = status_line(message, position, width);
        if self.last_status != status {
            queue!(
                out,
                cursor::MoveTo(0, rows as u16),
                Clear(ClearType::CurrentLine),
                SetAttribute(Attribute::Reverse),
                Print(&status),
                SetAttribute(Attribute::Reset)
            )?;
            self.last_status = status;
        }

        let screen_row = caret_line.saturating_sub(self.scroll_offset);
        let screen_col = gutter + caret_col.saturating_sub(self.horizontal_scroll);
        queue!(
            out,
            cursor::MoveTo(screen_col as u16, screen_row as u16),
            cursor::Show
        )?;
        out.flush()
    }
}
