//! Application state management for aula.
//!
//! This module contains the `App` struct that wires the session store, the
//! auth client and the login flow together, plus the screen router the
//! login flow navigates through.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use aula_core::login::{Field, LOGIN_PATH, UNEXPECTED_ERROR_MESSAGE, WORKSPACE_PATH};
use aula_core::{
    ApiClient, AuthError, Config, FileStorage, LoginFlow, Navigator, Session, SessionStore,
    SubmitOutcome,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Answers to login requests running in the background
type LoginResult = std::result::Result<Session, AuthError>;

/// At most one login request is out at a time
const LOGIN_CHANNEL_SIZE: usize = 1;

// ============================================================================
// Routing
// ============================================================================

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Workspace,
}

impl Route {
    /// Resolve a path; anything unknown lands on the login screen
    pub fn from_path(path: &str) -> Self {
        match path.trim_matches('/') {
            WORKSPACE_PATH => Route::Workspace,
            _ => Route::Login,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Workspace => WORKSPACE_PATH,
        }
    }
}

/// Shared handle on the current route. Clones see the same route.
#[derive(Debug, Clone)]
pub struct Router {
    current: Rc<Cell<Route>>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        Self {
            current: Rc::new(Cell::new(initial)),
        }
    }

    pub fn current(&self) -> Route {
        self.current.get()
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        let route = Route::from_path(path);
        debug!(path, ?route, "Navigating");
        self.current.set(route);
    }
}

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Button => LoginFocus::Password,
        }
    }

    /// Form field under focus, if any
    pub fn field(&self) -> Option<Field> {
        match self {
            LoginFocus::Username => Some(Field::Username),
            LoginFocus::Password => Some(Field::Password),
            LoginFocus::Button => None,
        }
    }
}

impl From<Field> for LoginFocus {
    fn from(field: Field) -> Self {
        match field {
            Field::Username => LoginFocus::Username,
            Field::Password => LoginFocus::Password,
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    /// Where `config` is saved back to; `None` keeps it in memory only
    pub config_path: Option<PathBuf>,
    pub store: SessionStore,
    pub login: LoginFlow,
    pub router: Router,

    // UI State
    pub state: AppState,
    pub login_focus: LoginFocus,
    /// Set by the input handler; the main loop draws one frame, then submits
    pub submit_pending: bool,
    pub status_message: Option<String>,

    // Background login request
    login_tx: mpsc::Sender<LoginResult>,
    login_rx: mpsc::Receiver<LoginResult>,
    login_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let storage_dir = config.storage_dir()?;
        debug!(?storage_dir, "Local storage directory configured");
        let storage = Rc::new(FileStorage::new(storage_dir)?);

        let store = SessionStore::new(storage);
        let api = ApiClient::new(&config.api_base_url())?;
        info!(base_url = %api.base_url(), "Auth server configured");

        let config_path = Config::config_path()?;
        Ok(Self::with_services(config, Some(config_path), store, Arc::new(api)))
    }

    /// Assemble the app from already-built collaborators
    pub fn with_services(
        config: Config,
        config_path: Option<PathBuf>,
        store: SessionStore,
        auth: Arc<dyn aula_core::Authenticator>,
    ) -> Self {
        let initial = if store.is_logged_in() {
            Route::Workspace
        } else {
            Route::Login
        };
        let router = Router::new(initial);

        // Leaving the session for any reason sends the user back to login
        let guard = router.clone();
        store.subscribe(move |session| {
            if session.is_none() {
                guard.navigate(LOGIN_PATH);
            }
        });

        let mut login = LoginFlow::new(auth, store.clone(), Box::new(router.clone()));
        if let Some(username) = config.initial_username() {
            login = login.with_username(username);
        }

        let (login_tx, login_rx) = mpsc::channel(LOGIN_CHANNEL_SIZE);

        let mut app = Self {
            config,
            config_path,
            store,
            login,
            router,
            state: AppState::Normal,
            login_focus: LoginFocus::Username,
            submit_pending: false,
            status_message: None,
            login_tx,
            login_rx,
            login_task: None,
        };
        app.focus_first_empty_field();
        app
    }

    /// Current screen, never the workspace without a session
    pub fn route(&self) -> Route {
        match self.router.current() {
            Route::Workspace if !self.store.is_logged_in() => Route::Login,
            route => route,
        }
    }

    fn focus_first_empty_field(&mut self) {
        self.login_focus = if self.login.form().username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Ask the main loop to submit after the next frame is drawn.
    /// Ignored while a submission is already on its way.
    pub fn request_submit(&mut self) {
        if self.submit_pending || self.login.is_submitting() {
            debug!("Submit already in progress, ignoring");
            return;
        }
        self.submit_pending = true;
    }

    /// Send the login request in the background.
    ///
    /// The UI keeps handling input meanwhile; [`Self::check_login_result`]
    /// picks up the answer.
    pub fn start_submit(&mut self) {
        self.submit_pending = false;
        self.status_message = None;

        let credentials = match self.login.begin_submit() {
            Ok(credentials) => credentials,
            Err(outcome) => {
                self.after_submit(&outcome);
                return;
            }
        };

        let auth = self.login.authenticator();
        let tx = self.login_tx.clone();
        self.login_task = Some(tokio::spawn(async move {
            let result = auth.login(&credentials).await;
            if tx.send(result).await.is_err() {
                debug!("Login answer arrived after the app closed");
            }
        }));
    }

    /// Apply the answer of a background login request, if it has arrived
    pub fn check_login_result(&mut self) -> Option<SubmitOutcome> {
        // Checked first: a finished task has already sent whatever it had
        let finished = self.login_task.as_ref().is_some_and(|t| t.is_finished());

        match self.login_rx.try_recv() {
            Ok(result) => {
                self.login_task = None;
                let outcome = self.login.finish_submit(result);
                self.after_submit(&outcome);
                Some(outcome)
            }
            Err(_) if finished => {
                error!("Login task ended without an answer");
                self.login_task = None;
                self.login.abandon_submit();
                self.login_focus = LoginFocus::Password;
                self.status_message = Some(UNEXPECTED_ERROR_MESSAGE.to_string());
                None
            }
            Err(_) => None,
        }
    }

    /// Run the login flow with the current form values and wait for it
    pub async fn submit_login(&mut self) -> SubmitOutcome {
        self.submit_pending = false;
        self.status_message = None;

        let outcome = self.login.submit().await;
        self.after_submit(&outcome);
        outcome
    }

    fn after_submit(&mut self, outcome: &SubmitOutcome) {
        match outcome {
            SubmitOutcome::LoggedIn(session) => {
                self.remember_username(&session.username);
                self.status_message = Some(format!("Bienvenido, {}", session.username));
            }
            SubmitOutcome::Invalid(errors) => {
                if let Some(first) = errors.first() {
                    self.login_focus = first.field.into();
                }
            }
            SubmitOutcome::Rejected | SubmitOutcome::Failed => {
                self.login_focus = LoginFocus::Password;
            }
            SubmitOutcome::Busy => {}
        }
    }

    fn remember_username(&mut self, username: &str) {
        if self.config.last_username.as_deref() == Some(username) {
            return;
        }
        self.config.last_username = Some(username.to_string());
        self.save_config();
    }

    fn save_config(&self) {
        if let Some(ref path) = self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    /// Forget the session and go back to the login screen
    pub fn logout(&mut self) {
        match self.store.clear() {
            Ok(()) => {
                info!("Logged out");
                self.back_to_login("Sesión cerrada");
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear session");
                self.status_message = Some("No se pudo cerrar la sesión".to_string());
            }
        }
    }

    /// Wipe everything the application keeps in local storage, including
    /// the remembered username
    pub fn clear_all_storage(&mut self) {
        match self.store.clear_all() {
            Ok(()) => {
                info!("Local storage cleared");
                if self.config.last_username.take().is_some() {
                    self.save_config();
                }
                self.login.set_field(Field::Username, "");
                self.back_to_login("Almacenamiento local borrado");
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear local storage");
                self.status_message = Some("No se pudo borrar el almacenamiento".to_string());
            }
        }
    }

    fn back_to_login(&mut self, message: &str) {
        self.login.reset();
        self.focus_first_empty_field();
        self.status_message = Some(message.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================
