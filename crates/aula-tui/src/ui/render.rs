use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use aula_core::login::Field;

use crate::app::{App, AppState, LoginFocus, Route};

use super::styles;

/// Width of the text inside the username/password boxes
const INPUT_WIDTH: usize = 20;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    match app.route() {
        Route::Login => render_login(frame, app, chunks[1]),
        Route::Workspace => render_workspace(frame, app, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Aula";
    let right = match app.store.current() {
        Some(session) => format!("{} ", session.username),
        None => "sin sesión ".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + right.chars().count()),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

/// Pad or cut `text` to exactly `width` characters, keeping the end visible
fn fit(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len > width {
        text.chars().skip(len - width).collect()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let cursor = if focused { "▌" } else { " " };
    Line::from(vec![
        Span::styled(format!("  {:<12}[", label), styles::muted_style()),
        Span::styled(format!("{}{}", fit(&value, INPUT_WIDTH), cursor), styles::input_style(focused)),
        Span::styled("]", styles::muted_style()),
    ])
}

fn field_error_line(app: &App, field: Field) -> Line<'static> {
    match app.login.field_error(field) {
        Some(err) => Line::from(Span::styled(format!("  {}", err), styles::error_style())),
        None => Line::from(""),
    }
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect_fixed(44, 14, area);
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(Span::styled("  Iniciar sesión", styles::title_style())),
        Line::from(""),
    ];

    let form = app.login.form();
    lines.push(input_line(
        "Usuario:",
        form.username.clone(),
        app.login_focus == LoginFocus::Username,
    ));
    lines.push(field_error_line(app, Field::Username));

    let password = if app.login.password_hidden() {
        "*".repeat(form.password.chars().count())
    } else {
        form.password.clone()
    };
    lines.push(input_line(
        "Contraseña:",
        password,
        app.login_focus == LoginFocus::Password,
    ));
    lines.push(field_error_line(app, Field::Password));

    // Submit button
    let busy = app.submit_pending || app.login.is_submitting();
    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if busy {
        " Ingresando... "
    } else if button_focused {
        " ▶ Ingresar ◀ "
    } else {
        "   Ingresar   "
    };
    lines.push(Line::from(vec![
        Span::raw("             ["),
        Span::styled(label, styles::input_style(button_focused && !busy)),
        Span::raw("]"),
    ]));
    lines.push(Line::from(""));

    if let Some(message) = app.login.message() {
        lines.push(Line::from(Span::styled(format!("  {}", message), styles::error_style())));
    } else {
        lines.push(Line::from(""));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [Tab]", styles::help_key_style()),
        Span::styled(" campo  ", styles::muted_style()),
        Span::styled("[F2]", styles::help_key_style()),
        Span::styled(if app.login.password_hidden() { " mostrar  " } else { " ocultar  " }, styles::muted_style()),
        Span::styled("[Esc]", styles::help_key_style()),
        Span::styled(" salir", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}

fn render_workspace(frame: &mut Frame, app: &App, area: Rect) {
    let Some(session) = app.store.current() else {
        return;
    };

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Bienvenido, "),
            Span::styled(session.username.clone(), styles::highlight_style()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Rol:     ", styles::muted_style()),
            Span::raw(session.role_display().to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Estado:  ", styles::muted_style()),
            if session.ok {
                Span::styled("autenticado", styles::success_style())
            } else {
                Span::styled("no verificado", styles::error_style())
            },
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  [l]", styles::help_key_style()),
            Span::styled(" cerrar sesión   ", styles::muted_style()),
            Span::styled("[x]", styles::help_key_style()),
            Span::styled(" borrar almacenamiento   ", styles::muted_style()),
            Span::styled("[q]", styles::help_key_style()),
            Span::styled(" salir", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Espacio de trabajo ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.route().path()),
    };
    let right_text = " Ctrl+C salir ";

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 6, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   ¿Seguro que desea salir?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   ", styles::muted_style()),
            Span::styled("[S/Y]", styles::help_key_style()),
            Span::styled(" salir, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" cancelar", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_pads_short_text() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("", 2), "  ");
    }

    #[test]
    fn test_fit_keeps_tail_of_long_text() {
        assert_eq!(fit("abcdef", 3), "def");
        assert_eq!(fit("ñandú", 5), "ñandú");
    }

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect_fixed(40, 10, outer);
        assert_eq!(inner, Rect::new(30, 20, 40, 10));

        // Never larger than the area
        let tiny = centered_rect_fixed(40, 10, Rect::new(0, 0, 20, 5));
        assert_eq!(tiny.width, 20);
        assert_eq!(tiny.height, 5);
    }
}
