//! Aula - a terminal login client for the classroom auth server.
//!
//! Shows a login form, authenticates against `POST /auth`, keeps the
//! resulting session in local storage and opens the workspace screen.

mod app;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use aula_core::login::Field;
use aula_core::{Config, SubmitOutcome};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name inside the log directory
const LOG_FILE: &str = "aula.log";

const USAGE: &str = "\
Usage: aula [COMMAND]

Without a command, opens the login screen (or the workspace if a session
is stored).

Commands:
  --login    Log in from the command line
  --logout   Forget the stored session
  --whoami   Print the stored session
  --help     Show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Interactive,
    Login,
    Logout,
    Whoami,
    Help,
}

fn parse_command(arg: Option<&str>) -> Result<Command> {
    match arg {
        None => Ok(Command::Interactive),
        Some("--login") => Ok(Command::Login),
        Some("--logout") => Ok(Command::Logout),
        Some("--whoami") => Ok(Command::Whoami),
        Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => Err(anyhow::anyhow!("Unknown argument: {}\n\n{}", other, USAGE)),
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a file. The returned guard
/// flushes pending lines when dropped.
fn init_tracing(config: &Config) -> Result<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _log_guard = init_tracing(&config)?;

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match parse_command(args.get(1).map(String::as_str))? {
        Command::Interactive => {}
        Command::Login => return login_cli(App::new(config)?).await,
        Command::Logout => return logout_cli(App::new(config)?),
        Command::Whoami => return whoami_cli(&App::new(config)?),
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
    }

    info!("Aula starting");
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Aula shutting down");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // The frame above shows the request as in flight; now send it
        if app.submit_pending {
            app.start_submit();
        }

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        app.check_login_result();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Command-line modes
// ============================================================================

/// Prompted login without the full-screen UI
async fn login_cli(mut app: App) -> Result<()> {
    println!("\n=== Aula Login ===\n");

    let default_username = app.login.form().username.clone();
    let username = if default_username.is_empty() {
        prompt("Usuario: ")?
    } else {
        let input = prompt(&format!("Usuario [{}]: ", default_username))?;
        if input.is_empty() {
            default_username
        } else {
            input
        }
    };
    let password = rpassword::prompt_password("Contraseña: ")?;

    app.login.set_field(Field::Username, &username);
    app.login.set_field(Field::Password, &password);

    println!("\nAutenticando...");
    match app.submit_login().await {
        SubmitOutcome::LoggedIn(session) => {
            println!(
                "Sesión iniciada como {} (rol: {})\n",
                session.username,
                session.role_display()
            );
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            for err in &errors {
                eprintln!("{}", err);
            }
            Err(anyhow::anyhow!("Formulario incompleto"))
        }
        SubmitOutcome::Rejected | SubmitOutcome::Failed | SubmitOutcome::Busy => {
            let message = app.login.message().unwrap_or("Error de inicio de sesión");
            Err(anyhow::anyhow!("{}", message))
        }
    }
}

fn logout_cli(mut app: App) -> Result<()> {
    if !app.store.is_logged_in() {
        println!("No hay sesión guardada.");
        return Ok(());
    }
    app.logout();
    if app.store.is_logged_in() {
        return Err(anyhow::anyhow!("No se pudo cerrar la sesión"));
    }
    println!("Sesión cerrada.");
    Ok(())
}

fn whoami_cli(app: &App) -> Result<()> {
    match app.store.current() {
        Some(session) => println!("{} (rol: {})", session.username, session.role_display()),
        None => println!("No hay sesión guardada."),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(None).unwrap(), Command::Interactive);
        assert_eq!(parse_command(Some("--login")).unwrap(), Command::Login);
        assert_eq!(parse_command(Some("--logout")).unwrap(), Command::Logout);
        assert_eq!(parse_command(Some("--whoami")).unwrap(), Command::Whoami);
        assert_eq!(parse_command(Some("-h")).unwrap(), Command::Help);
    }

    #[test]
    fn test_unknown_argument_is_an_error() {
        let err = parse_command(Some("--bogus")).unwrap_err();
        assert!(err.to_string().starts_with("Unknown argument: --bogus"));
    }
}
