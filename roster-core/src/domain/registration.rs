//! Registration input and normalization
//!
//! A submission moves through three value types, each produced only by the
//! step before it:
//!
//! `RegistrationInput` --normalize--> `NormalizedInput` --validate--> `ValidatedInput`

use std::fmt;

use serde::Deserialize;

/// Placeholder printed instead of a plaintext password
pub(crate) const REDACTED: &str = "<redacted>";

/// Raw registration submission, exactly as the caller sent it
///
/// Missing fields deserialize to empty strings; the validator reports them
/// as ordinary length failures.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationInput {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trim the name fields and the email, and lowercase the email.
    ///
    /// Total and deterministic. The password is left untouched.
    pub fn normalize(self) -> NormalizedInput {
        NormalizedInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
        }
    }
}

impl fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Registration input after normalization
///
/// Invariant: `email` has no surrounding whitespace and no uppercase
/// characters.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

impl NormalizedInput {
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Turn back into a raw input, e.g. to normalize again
    pub fn into_raw(self) -> RegistrationInput {
        RegistrationInput {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
        }
    }
}

impl fmt::Debug for NormalizedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}
