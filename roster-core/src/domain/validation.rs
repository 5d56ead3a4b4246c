//! Registration validation rules
//!
//! Rules run in a fixed order and the first failing rule wins, so the same
//! input always produces the same message.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::account::NewAccount;
use super::registration::{NormalizedInput, REDACTED};

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 8;

/// local-part @ domain . tld, no whitespace, exactly one `@`
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// The first validation rule an input violated
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("first_name too short")]
    FirstNameTooShort,

    #[error("last_name too short")]
    LastNameTooShort,

    #[error("invalid email")]
    InvalidEmail,

    #[error("weak password (8+, upper, lower, digit)")]
    WeakPassword,
}

impl ValidationFailure {
    /// Name of the request field the rule applies to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationFailure::FirstNameTooShort => "first_name",
            ValidationFailure::LastNameTooShort => "last_name",
            ValidationFailure::InvalidEmail => "email",
            ValidationFailure::WeakPassword => "password",
        }
    }
}

/// Whether `email` has the general address shape
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Password policy: 8+ characters with an ASCII uppercase letter, an ASCII
/// lowercase letter and a decimal digit. No other requirements.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn is_long_enough(name: &str) -> bool {
    name.chars().count() >= MIN_NAME_LEN
}

impl NormalizedInput {
    /// Apply all rules in order, stopping at the first failure
    pub fn validate(self) -> Result<ValidatedInput, ValidationFailure> {
        if !is_long_enough(&self.first_name) {
            return Err(ValidationFailure::FirstNameTooShort);
        }
        if !is_long_enough(&self.last_name) {
            return Err(ValidationFailure::LastNameTooShort);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationFailure::InvalidEmail);
        }
        if !is_strong_password(&self.password) {
            return Err(ValidationFailure::WeakPassword);
        }

        Ok(ValidatedInput {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
        })
    }
}

/// Input that passed every rule. Only [`NormalizedInput::validate`] builds one.
pub struct ValidatedInput {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

impl ValidatedInput {
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Swap the plaintext password for its hash, consuming the input
    pub fn into_account(self, password_hash: String) -> NewAccount {
        NewAccount {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash,
        }
    }
}

impl fmt::Debug for ValidatedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}
