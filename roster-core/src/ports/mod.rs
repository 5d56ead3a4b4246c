//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The registration
//! pipeline depends only on these traits, not on concrete implementations.

mod account_store;
mod credential_hasher;

pub use account_store::{AccountStore, InsertOutcome};
pub use credential_hasher::CredentialHasher;
