//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, Route};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y' | 'Y' | 's' | 'S') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.route() {
        Route::Login => handle_login_input(app, key),
        Route::Workspace => {
            handle_workspace_input(app, key);
            Ok(false)
        }
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let busy = app.submit_pending || app.login.is_submitting();

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::F(2) => {
            app.login.toggle_password_visibility();
        }
        // The values on their way to the server stay as sent
        _ if busy => {}
        KeyCode::Enter => match app.login_focus.field() {
            // Move to the next field, then the button
            Some(_) => app.login_focus = app.login_focus.next(),
            None => app.request_submit(),
        },
        KeyCode::Backspace => {
            if let Some(field) = app.login_focus.field() {
                app.login.pop_char(field);
            }
        }
        KeyCode::Char(c) => {
            // Character input on the button is ignored
            if let Some(field) = app.login_focus.field() {
                app.login.push_char(field, c);
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_workspace_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('l') => app.logout(),
        KeyCode::Char('x') => app.clear_all_storage(),
        KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::sync::Arc;

    use aula_core::login::Field;
    use aula_core::{AuthError, Authenticator, Config, Credentials, MemoryStorage, Session, SessionStore};
    use crossterm::event::KeyModifiers;

    use crate::app::LoginFocus;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl Authenticator for NeverCalled {
        async fn login(&self, _credentials: &Credentials) -> Result<Session, AuthError> {
            panic!("input handling must not authenticate directly");
        }
    }

    fn app() -> App {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        App::with_services(Config::default(), None, store, Arc::new(NeverCalled))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_input(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_fills_focused_field() {
        let mut app = app();
        app.login_focus = LoginFocus::Username;
        type_str(&mut app, "alice");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "secrett");
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.login.form().value(Field::Username), "alice");
        assert_eq!(app.login.form().value(Field::Password), "secret");
    }

    #[test]
    fn test_enter_on_button_requests_submit() {
        let mut app = app();
        app.login_focus = LoginFocus::Password;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.login_focus, LoginFocus::Button);
        assert!(!app.submit_pending);

        press(&mut app, KeyCode::Enter);
        assert!(app.submit_pending);
    }

    #[test]
    fn test_input_ignored_while_submit_pending() {
        let mut app = app();
        app.login_focus = LoginFocus::Username;
        app.submit_pending = true;
        type_str(&mut app, "bob");
        assert_eq!(app.login.form().username, "");
    }

    #[test]
    fn test_navigation_keys_work_while_submitting() {
        let mut app = app();
        app.login.set_field(Field::Username, "alice");
        app.login.set_field(Field::Password, "secret");
        app.login.begin_submit().unwrap();
        app.login_focus = LoginFocus::Button;

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.login_focus, LoginFocus::Username);
        press(&mut app, KeyCode::F(2));
        assert!(!app.login.password_hidden());

        type_str(&mut app, "x");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.login.form().username, "alice");

        assert!(press(&mut app, KeyCode::Esc));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[test]
    fn test_f2_toggles_password_visibility() {
        let mut app = app();
        assert!(app.login.password_hidden());
        press(&mut app, KeyCode::F(2));
        assert!(!app.login.password_hidden());
    }

    #[test]
    fn test_esc_on_login_quits() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Esc));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[test]
    fn test_workspace_logout_key() {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        store
            .set(Session {
                ok: true,
                role: "admin".to_string(),
                username: "alice".to_string(),
            })
            .unwrap();
        let mut app = App::with_services(Config::default(), None, store, Arc::new(NeverCalled));
        assert_eq!(app.route(), Route::Workspace);

        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.state, AppState::ConfirmingQuit);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.state, AppState::Normal);

        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.route(), Route::Login);
    }
}
