use std::fmt;

use crate::auth::Credentials;

/// Maximum length for username input.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Username => "Usuario",
            Field::Password => "Contraseña",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
}

/// A single validation failure, tied to the field that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldErrorKind::Required => write!(f, "{} es obligatorio", self.field.label()),
        }
    }
}

/// Values typed into the login form
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: String::new(),
        }
    }

    /// Both fields are required. Values are checked as typed.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.username.is_empty() {
            errors.push(FieldError {
                field: Field::Username,
                kind: FieldErrorKind::Required,
            });
        }
        if self.password.is_empty() {
            errors.push(FieldError {
                field: Field::Password,
                kind: FieldErrorKind::Required,
            });
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Snapshot the form into credentials for one request
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Password => &self.password,
        }
    }

    /// Append a character, ignoring control characters and overlong input.
    /// Returns whether the character was accepted.
    pub fn push_char(&mut self, field: Field, c: char) -> bool {
        let accepted = match field {
            Field::Username => can_add_username_char(self.username.chars().count(), c),
            Field::Password => can_add_password_char(self.password.chars().count(), c),
        };
        if accepted {
            self.field_mut(field).push(c);
        }
        accepted
    }

    pub fn pop_char(&mut self, field: Field) {
        self.field_mut(field).pop();
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password_len", &self.password.len())
            .finish()
    }
}

/// Check if a character is valid for text input (printable, non-control)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}
