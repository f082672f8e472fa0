//! Full-screen terminal front end.

pub mod keys;
pub mod terminal;
pub mod view;

use crate::platform::Dialogs;
use crate::session::{Edit, EditorSession, Outcome, UnloadDecision};
use crate::worker::Registration;
use crate::worker::fetch::{FetchError, Network, Request, Response};
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use keys::{Action, KeyHandler};
use std::io::{Write, stdout};
use terminal::Terminal;
use tracing::{info, warn};
use view::View;

pub const LEAVE_PROMPT: &str = "Leave SimplePad? Changes you made may not be saved.";

const HELP_URL: &str = "/help.txt";
const ABOUT_URL: &str = "/about.txt";

/// Where the help and about screens come from: through the registered
/// cache controller, or straight from the origin when none is registered.
pub enum Assets {
    Registered(Registration),
    Direct(Box<dyn Network>),
}

impl Assets {
    pub async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let request = Request::get(url);
        match self {
            Assets::Registered(registration) => registration.fetch(&request).await,
            Assets::Direct(network) => network.fetch(&request).await,
        }
    }
}

/// Status line text for an operation's outcome.
pub fn outcome_message(outcome: Outcome) -> String {
    match outcome {
        Outcome::Done(message) => message,
        Outcome::Declined => "Kept unsaved changes".to_string(),
        Outcome::Cancelled => "Cancelled".to_string(),
        Outcome::Failed => String::new(),
    }
}

/// Clipboard text with line endings folded to `\n`.
/// Alternate screen plus bracketed paste, so pasted text arrives as one
/// `Event::Paste` instead of a burst of key presses.
fn enter_screen(out: &mut impl Write) -> std::io::Result<()> {
    execute!(out, EnterAlternateScreen, EnableBracketedPaste)
}

fn leave_screen(out: &mut impl Write) -> std::io::Result<()> {
    execute!(out, DisableBracketedPaste, cursor::Show, LeaveAlternateScreen)
}

pub fn normalize_paste(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub struct App {
    session: EditorSession,
    terminal: Terminal,
    view: View,
    assets: Assets,
    message: String,
}

impl App {
    pub fn new(session: EditorSession, assets: Assets, line_numbers: bool) -> Self {
        let mut view = View::new();
        view.set_line_numbers(line_numbers);
        Self {
            session,
            terminal: Terminal::new(),
            view,
            assets,
            message: "F1 for help".to_string(),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        enter_screen(&mut stdout())?;
        enable_raw_mode()?;

        // Restores the terminal even on panic
        struct TerminalGuard;
        impl Drop for TerminalGuard {
            fn drop(&mut self) {
                let _ = disable_raw_mode();
                let _ = leave_screen(&mut stdout());
            }
        }
        let _guard = TerminalGuard;

        self.run_loop().await
    }

    async fn run_loop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            self.view.render(
                self.session.document(),
                self.session.cursor_position(),
                &self.session.title(),
                &self.message,
            )?;

            let Some(event) = self.terminal.next_event().await? else {
                info!("terminal input closed");
                break;
            };

            match event {
                Event::Key(key_event) => {
                    let Some(action) = KeyHandler::parse_key(&key_event, self.view.text_rows())
                    else {
                        continue;
                    };
                    if self.perform(action).await {
                        break;
                    }
                }
                Event::Paste(text) => self.edit(Edit::InsertText(normalize_paste(&text))),
                Event::Resize(_, _) => self.view.force_redraw(),
                _ => {}
            }
        }
        Ok(())
    }

    fn edit(&mut self, edit: Edit) {
        if self.session.apply_edit(edit) {
            self.message.clear();
        }
    }

    /// Carry out `action`. Returns true when the application should exit.
    async fn perform(&mut self, action: Action) -> bool {
        match action {
            Action::Edit(edit) => self.edit(edit),
            Action::Move(motion) => self.session.apply_motion(motion),
            Action::New => {
                let outcome = self.session.new_document(&mut self.terminal).await;
                self.finish(outcome);
            }
            Action::Open => {
                let outcome = self.session.open_document(&mut self.terminal).await;
                self.finish(outcome);
            }
            Action::Save => {
                let outcome = self.session.save(&mut self.terminal).await;
                self.finish(outcome);
            }
            Action::SaveAs => {
                let outcome = self.session.save_as(&mut self.terminal).await;
                self.finish(outcome);
            }
            Action::Paste => self.paste(),
            Action::Help => self.show_asset(HELP_URL, "Help").await,
            Action::About => self.show_asset(ABOUT_URL, "About").await,
            Action::Quit => return self.confirm_quit().await,
        }
        false
    }

    fn finish(&mut self, outcome: Outcome) {
        self.message = outcome_message(outcome);
        self.view.force_redraw();
    }

    fn paste(&mut self) {
        let text = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text());
        match text {
            Ok(text) => self.edit(Edit::InsertText(normalize_paste(&text))),
            Err(err) => {
                warn!(%err, "clipboard read failed");
                self.message = "Clipboard unavailable".to_string();
            }
        }
    }

    async fn show_asset(&mut self, url: &str, label: &str) {
        match self.assets.fetch(url).await {
            Ok(response) if response.ok() => {
                if let Err(err) = self.terminal.show_page(&response.text()).await {
                    warn!(%err, url, "failed to draw page");
                }
                self.message.clear();
            }
            Ok(response) => {
                warn!(url, status = response.status, "asset request was not ok");
                self.message = format!("{label} unavailable ({})", response.status);
            }
            Err(err) => {
                warn!(%err, url, "asset request failed");
                self.message = format!("{label} unavailable offline");
            }
        }
        self.view.force_redraw();
    }

    async fn confirm_quit(&mut self) -> bool {
        let leave = match self.session.before_unload() {
            UnloadDecision::Allow => true,
            UnloadDecision::Prompt => self.terminal.confirm(LEAVE_PROMPT).await,
        };
        if !leave {
            self.view.force_redraw();
        }
        leave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;
    use crate::worker::CacheController;
    use crate::worker::cache::MemoryCacheStorage;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            outcome_message(Outcome::Done("\"a.txt\" 3B written".to_string())),
            "\"a.txt\" 3B written"
        );
        assert_eq!(outcome_message(Outcome::Cancelled), "Cancelled");
        assert_eq!(outcome_message(Outcome::Declined), "Kept unsaved changes");
        assert_eq!(outcome_message(Outcome::Failed), "");
    }

    #[test]
    fn test_paste_line_endings() {
        assert_eq!(normalize_paste("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_screen_toggles_bracketed_paste() {
        let mut out = Vec::new();
        enter_screen(&mut out).unwrap();
        let entered = String::from_utf8(out).unwrap();
        assert!(entered.contains("\x1b[?1049h"));
        assert!(entered.contains("\x1b[?2004h"));

        let mut out = Vec::new();
        leave_screen(&mut out).unwrap();
        let left = String::from_utf8(out).unwrap();
        assert!(left.contains("\x1b[?2004l"));
        assert!(left.contains("\x1b[?1049l"));
    }

    #[tokio::test]
    async fn test_direct_assets_hit_network() {
        let network = ScriptedNetwork::new().serve(HELP_URL, "keys");
        let assets = Assets::Direct(Box::new(network.clone()));

        assert_eq!(assets.fetch(HELP_URL).await.unwrap().text(), "keys");
        assert!(assets.fetch(ABOUT_URL).await.is_err());
        assert_eq!(network.requests(), vec![HELP_URL, ABOUT_URL]);
    }

    #[tokio::test]
    async fn test_registered_assets_survive_going_offline() {
        let online = ScriptedNetwork::new()
            .serve(HELP_URL, "keys")
            .serve(ABOUT_URL, "about");
        let controller = CacheController::with_manifest(
            "test-v1",
            vec![HELP_URL.to_string(), ABOUT_URL.to_string()],
            Box::new(MemoryCacheStorage::new()),
            Box::new(online),
        );
        // The page-side network is already gone.
        let registration =
            Registration::register("/sw", controller, Box::new(ScriptedNetwork::new())).await;
        let assets = Assets::Registered(registration);

        assert_eq!(assets.fetch(ABOUT_URL).await.unwrap().text(), "about");
    }
}
