use crate::session::{Edit, Motion};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Everything a key press can ask the application to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Edit(Edit),
    Move(Motion),
    New,
    Open,
    Save,
    SaveAs,
    Paste,
    Help,
    About,
    Quit,
}

pub struct KeyHandler;

impl KeyHandler {
    /// Map a key event to an action. `page_size` is the number of text rows
    /// PageUp/PageDown move by.
    pub fn parse_key(key_event: &KeyEvent, page_size: usize) -> Option<Action> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }
        let modifiers = key_event.modifiers;
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        let alt = modifiers.contains(KeyModifiers::ALT);
        let shift = modifiers.contains(KeyModifiers::SHIFT);

        match key_event.code {
            // Shortcuts first; some terminals report Ctrl+Shift+S as an
            // uppercase S without the shift bit.
            KeyCode::Char('s') | KeyCode::Char('S') if ctrl && shift => Some(Action::SaveAs),
            KeyCode::Char('S') if ctrl => Some(Action::SaveAs),
            KeyCode::Char('s') | KeyCode::Char('S') if alt => Some(Action::SaveAs),
            KeyCode::Char('s') if ctrl => Some(Action::Save),
            KeyCode::Char('n') if ctrl => Some(Action::New),
            KeyCode::Char('o') if ctrl => Some(Action::Open),
            KeyCode::Char('v') if ctrl => Some(Action::Paste),
            KeyCode::Char('q') if ctrl => Some(Action::Quit),
            KeyCode::F(1) => Some(Action::Help),
            KeyCode::F(2) => Some(Action::About),
            KeyCode::F(12) => Some(Action::SaveAs),

            KeyCode::Char(_) if ctrl || alt => None,
            KeyCode::Char(c) => Some(Action::Edit(Edit::Insert(c))),
            KeyCode::Enter => Some(Action::Edit(Edit::Newline)),
            KeyCode::Tab => Some(Action::Edit(Edit::Insert('\t'))),
            KeyCode::Backspace => Some(Action::Edit(Edit::DeleteBackward)),
            KeyCode::Delete => Some(Action::Edit(Edit::DeleteForward)),

            KeyCode::Left => Some(Action::Move(Motion::Left)),
            KeyCode::Right => Some(Action::Move(Motion::Right)),
            KeyCode::Up => Some(Action::Move(Motion::Up(1))),
            KeyCode::Down => Some(Action::Move(Motion::Down(1))),
            KeyCode::Home if ctrl => Some(Action::Move(Motion::DocumentStart)),
            KeyCode::End if ctrl => Some(Action::Move(Motion::DocumentEnd)),
            KeyCode::Home => Some(Action::Move(Motion::LineStart)),
            KeyCode::End => Some(Action::Move(Motion::LineEnd)),
            KeyCode::PageUp => Some(Action::Move(Motion::Up(page_size.max(1)))),
            KeyCode::PageDown => Some(Action::Move(Motion::Down(page_size.max(1)))),

            _ => None,
        }
    }
}
