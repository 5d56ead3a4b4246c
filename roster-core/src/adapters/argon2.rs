//! Argon2id credential hasher

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::config::HasherSettings;
use crate::domain::result::{Error, Result};
use crate::ports::CredentialHasher;

/// Argon2id with a fixed work factor and a fresh 16-byte salt per hash.
///
/// Output is a PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<digest>`.
/// Verification reads the parameters from the stored string, so hashes made
/// under an older work factor still verify.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(settings: &HasherSettings) -> Result<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| Error::config(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt).map_err(|e| Error::hashing(e.to_string()))?;

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(password_hash).map_err(|e| Error::hashing(e.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::hashing(e.to_string())),
        }
    }
}
