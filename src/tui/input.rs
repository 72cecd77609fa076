//! Input handling and keybindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::state::AppState;

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// No action, continue.
    None,
    /// Quit the application.
    Quit,
}

const PAGE: isize = 10;

/// Handles key input and updates state.
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }
    if state.show_help {
        return handle_help(state, key);
    }
    state.status_message = None;

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            state.toggle_pause();
            KeyAction::None
        }
        KeyCode::Char('v') | KeyCode::Tab => {
            state.cycle_view();
            KeyAction::None
        }
        KeyCode::Char('?') | KeyCode::Char('h') => {
            state.show_help = true;
            state.help_scroll = 0;
            KeyAction::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.scroll_by(1);
            KeyAction::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.scroll_by(-1);
            KeyAction::None
        }
        KeyCode::PageDown => {
            state.scroll_by(PAGE);
            KeyAction::None
        }
        KeyCode::PageUp => {
            state.scroll_by(-PAGE);
            KeyAction::None
        }
        KeyCode::Home => {
            state.scroll = 0;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

fn handle_help(state: &mut AppState, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('q') => {
            state.show_help = false;
        }
        KeyCode::Down | KeyCode::Char('j') => state.help_scroll += 1,
        KeyCode::Up | KeyCode::Char('k') => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
        }
        _ => {}
    }
    KeyAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewMode;
    use crate::tui::state::SessionInfo;

    fn state() -> AppState {
        AppState::new(
            SessionInfo {
                host: "localhost".into(),
                nodes_label: "default nodeset".into(),
                node_count: 1,
                interval_secs: 3.0,
            },
            ViewMode::Flat,
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let mut s = state();
        assert_eq!(handle_key(&mut s, key(KeyCode::Char('q'))), KeyAction::Quit);
        assert_eq!(handle_key(&mut s, key(KeyCode::Esc)), KeyAction::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut s, ctrl_c), KeyAction::Quit);
    }

    #[test]
    fn test_space_toggles_pause() {
        let mut s = state();
        handle_key(&mut s, key(KeyCode::Char(' ')));
        assert!(s.paused);
        handle_key(&mut s, key(KeyCode::Char(' ')));
        assert!(!s.paused);
    }

    #[test]
    fn test_help_captures_keys() {
        let mut s = state();
        handle_key(&mut s, key(KeyCode::Char('?')));
        assert!(s.show_help);
        // 'q' closes help instead of quitting.
        assert_eq!(handle_key(&mut s, key(KeyCode::Char('q'))), KeyAction::None);
        assert!(!s.show_help);
    }

    #[test]
    fn test_view_cycle_key() {
        let mut s = state();
        handle_key(&mut s, key(KeyCode::Char('v')));
        assert_eq!(s.view, ViewMode::Separated);
    }
}
