//! Account domain model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A validated account with a hashed password, ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// A persisted account
///
/// Created once by the account store and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    /// Store-assigned, monotonically increasing
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all accounts, lowercase
    pub email: String,
    /// PHC-format hash string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
