//! Result, error and outcome types for the core library

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::account::AccountRecord;
use super::validation::ValidationFailure;

/// Response message for a successful registration
pub const REGISTERED_MESSAGE: &str = "registered";

/// Response message when the email is already taken
pub const CONFLICT_MESSAGE: &str = "email already exists";

/// Response message for any internal failure. Never carries detail.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Core library error type
///
/// These are operational failures (storage, hashing, configuration). They
/// never describe a problem with caller input; that is [`ValidationFailure`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a pool error
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Create a hashing error
    pub fn hashing(msg: impl Into<String>) -> Self {
        Self::Hashing(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Stages of the registration pipeline, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Normalized,
    Validated,
    Hashed,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Normalized => "normalized",
            Stage::Validated => "validated",
            Stage::Hashed => "hashed",
            Stage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// The four mutually exclusive outcome kinds of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ValidationFailure,
    Conflict,
    InternalFailure,
}

/// An internal failure, with the stage the pipeline could not reach
///
/// `detail` is for the operational log only and must never be sent to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFailure {
    pub stage: Stage,
    pub detail: String,
}

impl InternalFailure {
    pub fn new(stage: Stage, error: &Error) -> Self {
        Self {
            stage,
            detail: error.to_string(),
        }
    }
}

/// Terminal state of one pipeline run
#[derive(Debug)]
pub enum RegistrationOutcome {
    /// The account was persisted
    Registered(AccountRecord),
    /// The input broke a validation rule; nothing was hashed or stored
    Invalid(ValidationFailure),
    /// Another account already owns the email
    Conflict,
    /// Hashing or storage failed for reasons unrelated to the input
    Internal(InternalFailure),
}

impl RegistrationOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            RegistrationOutcome::Registered(_) => OutcomeKind::Success,
            RegistrationOutcome::Invalid(_) => OutcomeKind::ValidationFailure,
            RegistrationOutcome::Conflict => OutcomeKind::Conflict,
            RegistrationOutcome::Internal(_) => OutcomeKind::InternalFailure,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered(_))
    }

    /// Caller-facing message. Consumers match on this text.
    pub fn message(&self) -> String {
        match self {
            RegistrationOutcome::Registered(_) => REGISTERED_MESSAGE.to_string(),
            RegistrationOutcome::Invalid(failure) => failure.to_string(),
            RegistrationOutcome::Conflict => CONFLICT_MESSAGE.to_string(),
            RegistrationOutcome::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// The persisted record, if the registration succeeded
    pub fn account(&self) -> Option<&AccountRecord> {
        match self {
            RegistrationOutcome::Registered(record) => Some(record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            RegistrationOutcome::Invalid(ValidationFailure::InvalidEmail).message(),
            "invalid email"
        );
        assert_eq!(RegistrationOutcome::Conflict.message(), "email already exists");
    }

    #[test]
    fn test_internal_message_hides_detail() {
        let failure = InternalFailure::new(
            Stage::Persisted,
            &Error::database("IO Error: could not write to /var/lib/roster.duckdb"),
        );
        let outcome = RegistrationOutcome::Internal(failure);

        assert_eq!(outcome.kind(), OutcomeKind::InternalFailure);
        assert_eq!(outcome.message(), "internal error");
        assert!(!outcome.message().contains("roster.duckdb"));
    }

    #[test]
    fn test_internal_failure_keeps_detail_for_logs() {
        let failure = InternalFailure::new(Stage::Hashed, &Error::hashing("rng unavailable"));
        assert_eq!(failure.stage, Stage::Hashed);
        assert!(failure.detail.contains("rng unavailable"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Persisted.to_string(), "persisted");
        assert_eq!(Stage::Received.to_string(), "received");
    }
}
