//! The login screen's controller.
//!
//! - `form`: the values typed by the user and their validation
//! - `flow`: the submit state machine wiring the form to the auth client,
//!   the session store and navigation

pub mod flow;
pub mod form;

pub use flow::{
    LoginFlow, LoginState, Navigator, SubmitOutcome, INVALID_CREDENTIALS_MESSAGE, LOGIN_PATH,
    UNEXPECTED_ERROR_MESSAGE, WORKSPACE_PATH,
};
pub use form::{Field, FieldError, FieldErrorKind, LoginForm};
