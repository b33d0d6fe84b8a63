//! Login state machine.
//!
//! `Editing -> Submitting -> Success | Failed`. A failed attempt keeps the
//! typed values; the next edit moves the flow back to `Editing`, and a new
//! submit is allowed straight from `Failed`.
//!
//! [`LoginFlow::submit`] drives a whole attempt. Front ends that keep
//! handling input while the request is out use the two halves instead:
//! [`LoginFlow::begin_submit`] hands back the credentials to send, and
//! [`LoginFlow::finish_submit`] applies whatever the server answered.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::{AuthError, Authenticator};
use crate::auth::{Credentials, Session, SessionStore};

use super::form::{Field, FieldError, LoginForm};

/// Route of the protected area reached after a successful login
pub const WORKSPACE_PATH: &str = "auth/workspace";

/// Route of the login screen
pub const LOGIN_PATH: &str = "login";

/// Shown when the server rejects the credentials (HTTP 401)
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Usuario o contraseña incorrectos";

/// Shown for every other failure; details only go to the log
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Error inesperado. Intente de nuevo.";

/// Hands control to another screen of the application
pub trait Navigator {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Editing,
    Submitting,
    Success,
    Failed { message: String },
}

/// What a call to [`LoginFlow::submit`] ended in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form was incomplete; nothing was sent
    Invalid(Vec<FieldError>),
    /// Session stored and navigation triggered
    LoggedIn(Session),
    /// The server said the credentials are wrong
    Rejected,
    /// Anything else went wrong; already logged
    Failed,
    /// A submission is already on its way; nothing was sent
    Busy,
}

pub struct LoginFlow {
    form: LoginForm,
    state: LoginState,
    field_errors: Vec<FieldError>,
    hide_password: bool,

    auth: Arc<dyn Authenticator>,
    store: SessionStore,
    navigator: Box<dyn Navigator>,
}

impl LoginFlow {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        store: SessionStore,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        Self {
            form: LoginForm::default(),
            state: LoginState::Editing,
            field_errors: Vec::new(),
            hide_password: true,
            auth,
            store,
            navigator,
        }
    }

    /// Prefill the username (e.g. the last one that logged in)
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.form = LoginForm::new(username);
        self
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == LoginState::Submitting
    }

    /// User-facing message of the last failed attempt
    pub fn message(&self) -> Option<&str> {
        match &self.state {
            LoginState::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// Validation errors from the last submit attempt
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn field_error(&self, field: Field) -> Option<&FieldError> {
        self.field_errors.iter().find(|e| e.field == field)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn push_char(&mut self, field: Field, c: char) {
        if self.form.push_char(field, c) {
            self.edited(field);
        }
    }

    pub fn pop_char(&mut self, field: Field) {
        self.form.pop_char(field);
        self.edited(field);
    }

    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::Username => self.form.username = value.to_string(),
            Field::Password => self.form.password = value.to_string(),
        }
        self.edited(field);
    }

    fn edited(&mut self, field: Field) {
        if matches!(self.state, LoginState::Failed { .. } | LoginState::Success) {
            self.state = LoginState::Editing;
        }
        self.field_errors.retain(|e| e.field != field);
    }

    pub fn password_hidden(&self) -> bool {
        self.hide_password
    }

    /// Flip password visibility; independent of the login state
    pub fn toggle_password_visibility(&mut self) {
        self.hide_password = !self.hide_password;
    }

    /// Back to a fresh form for the next time the login screen is shown.
    /// The username is kept.
    pub fn reset(&mut self) {
        self.form.password.clear();
        self.state = LoginState::Editing;
        self.field_errors.clear();
        self.hide_password = true;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Authenticator the flow sends credentials to
    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        Arc::clone(&self.auth)
    }

    /// Validate, authenticate, store the session and navigate.
    ///
    /// Never returns an error: every failure is turned into a message and
    /// leaves the form editable with its values intact. Dropping the
    /// returned future before it completes puts the flow back in `Editing`.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let credentials = match self.begin_submit() {
            Ok(credentials) => credentials,
            Err(outcome) => return outcome,
        };

        let auth = Arc::clone(&self.auth);
        let pending = PendingSubmit::new(&mut self.state);
        let result = auth.login(&credentials).await;
        pending.settle();

        self.finish_submit(result)
    }

    /// Validate the form and enter `Submitting`.
    ///
    /// Returns the credentials to send, or the outcome when nothing should
    /// be sent (`Busy` or `Invalid`).
    pub fn begin_submit(&mut self) -> Result<Credentials, SubmitOutcome> {
        if self.is_submitting() {
            debug!("Login already submitting, ignoring");
            return Err(SubmitOutcome::Busy);
        }

        let errors = self.form.validate();
        if !errors.is_empty() {
            debug!(missing = errors.len(), "Login form incomplete, not submitting");
            self.field_errors = errors.clone();
            self.state = LoginState::Editing;
            return Err(SubmitOutcome::Invalid(errors));
        }

        self.field_errors.clear();
        self.state = LoginState::Submitting;

        let credentials = self.form.credentials();
        info!(username = %credentials.username, "Submitting login");
        Ok(credentials)
    }

    /// Apply the answer to a request started with [`Self::begin_submit`]
    pub fn finish_submit(&mut self, result: Result<Session, AuthError>) -> SubmitOutcome {
        match result {
            Ok(session) => self.complete(session),
            Err(e) => self.fail(e),
        }
    }

    /// Give up on a request whose answer will never be applied
    pub fn abandon_submit(&mut self) {
        abandon(&mut self.state);
    }

    fn complete(&mut self, session: Session) -> SubmitOutcome {
        if let Err(e) = self.store.set(session.clone()) {
            error!(error = %e, "Failed to persist session after login");
            self.state = LoginState::Failed {
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            };
            return SubmitOutcome::Failed;
        }

        info!(username = %session.username, role = %session.role, "Login successful");
        self.form.password.clear();
        self.state = LoginState::Success;
        self.navigator.navigate(WORKSPACE_PATH);
        SubmitOutcome::LoggedIn(session)
    }

    fn fail(&mut self, e: AuthError) -> SubmitOutcome {
        if e.is_invalid_credentials() {
            warn!(username = %self.form.username, "Login rejected: invalid credentials");
            self.state = LoginState::Failed {
                message: INVALID_CREDENTIALS_MESSAGE.to_string(),
            };
            SubmitOutcome::Rejected
        } else {
            error!(error = %e, status = ?e.status(), "Unexpected login error");
            self.state = LoginState::Failed {
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            };
            SubmitOutcome::Failed
        }
    }
}

fn abandon(state: &mut LoginState) {
    if *state == LoginState::Submitting {
        debug!("Login submission abandoned");
        *state = LoginState::Editing;
    }
}

/// Holds the flow in `Submitting` while a request is out.
/// Dropped without [`PendingSubmit::settle`], it returns the flow to `Editing`.
struct PendingSubmit<'a> {
    state: Option<&'a mut LoginState>,
}

impl<'a> PendingSubmit<'a> {
    fn new(state: &'a mut LoginState) -> Self {
        Self { state: Some(state) }
    }

    fn settle(mut self) {
        self.state = None;
    }
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            abandon(state);
        }
    }
}

impl fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginFlow")
            .field("form", &self.form)
            .field("state", &self.state)
            .field("field_errors", &self.field_errors)
            .field("hide_password", &self.hide_password)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
