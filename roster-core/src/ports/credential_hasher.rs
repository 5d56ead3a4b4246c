//! Credential hasher port

use crate::domain::result::Result;

/// One-way, salted password hashing
///
/// Calls are CPU-bound and deliberately slow; async callers should run them
/// on the blocking thread pool.
pub trait CredentialHasher: Send + Sync {
    /// Derive a self-describing hash string (algorithm, parameters, salt and
    /// digest) from `password`. Two calls never return the same string.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a string previously returned by [`hash`].
    ///
    /// [`hash`]: CredentialHasher::hash
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool>;
}
