//! Account store port - durable account persistence

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{AccountRecord, NewAccount};

/// What happened to an insert that reached the store
#[derive(Debug)]
pub enum InsertOutcome {
    /// The account was written and committed
    Created(AccountRecord),
    /// The email uniqueness constraint rejected the row. Expected under
    /// concurrent identical submissions; not a storage failure.
    DuplicateEmail,
}

/// Account persistence abstraction
///
/// Implementations must enforce email uniqueness with the store's own
/// atomic constraint. Checking for an existing email before inserting is
/// not acceptable: two concurrent requests would both pass the check.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert one account, all or nothing.
    ///
    /// `Err` means the store malfunctioned (connectivity, schema, timeout)
    /// and carries detail for the operational log only.
    async fn insert(&self, account: NewAccount) -> Result<InsertOutcome>;
}
