//! Core domain entities
//!
//! Registration values, validation rules, the account record and the
//! outcome taxonomy. Pure data and logic - no I/O.

mod account;
mod registration;
pub mod result;
pub mod validation;

pub use account::{AccountRecord, NewAccount};
pub use registration::{NormalizedInput, RegistrationInput};
pub use result::{InternalFailure, OutcomeKind, RegistrationOutcome, Stage};
pub use validation::{ValidatedInput, ValidationFailure};
