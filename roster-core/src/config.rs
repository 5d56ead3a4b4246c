//! Configuration management
//!
//! Settings live in `settings.json` inside the roster directory. Every field
//! has a default, so a missing file or a partial file is fine:
//! ```json
//! {
//!   "database": { "path": "roster.duckdb" },
//!   "pool": { "maxSize": 10, "maxLifetimeSecs": 120, "waitTimeoutMs": 5000 },
//!   "server": { "bind": "0.0.0.0:8080", "requestTimeoutSecs": 10 },
//!   "hasher": { "memoryKib": 19456, "iterations": 2, "parallelism": 1 }
//! }
//! ```
//!
//! Environment variables override the file:
//! `ROSTER_DB_PATH`, `ROSTER_DB_KEY`, `ROSTER_BIND`, `ROSTER_POOL_MAX_SIZE`,
//! `ROSTER_POOL_MAX_LIFETIME_SECS`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Database path that selects a private in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Roster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub database: DatabaseSettings,
    pub pool: PoolSettings,
    pub server: ServerSettings,
    pub hasher: HasherSettings,
}

/// Where accounts are stored
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseSettings {
    /// DuckDB file, relative to the roster directory, or `:memory:`
    pub path: PathBuf,
    /// Hex key for an encrypted database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("roster.duckdb"),
            encryption_key: None,
        }
    }
}

impl DatabaseSettings {
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(IN_MEMORY_PATH),
            encryption_key: None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("path", &self.path)
            .field("encrypted", &self.encryption_key.is_some())
            .finish()
    }
}

/// Storage connection pool limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolSettings {
    pub max_size: usize,
    /// Connections older than this are discarded instead of reused
    pub max_lifetime_secs: u64,
    /// How long a caller waits for a free connection before failing
    pub wait_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_lifetime_secs: 120,
            wait_timeout_ms: 5000,
        }
    }
}

impl PoolSettings {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Argon2id work factor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HasherSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherSettings {
    fn default() -> Self {
        // 19 MiB, 2 passes: tens of milliseconds per hash on current hardware
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Config {
    /// Load config from the roster directory and apply environment overrides
    pub fn load(roster_dir: &Path) -> Result<Self> {
        let settings_path = roster_dir.join("settings.json");

        let mut config: Config = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.resolve_paths(roster_dir);
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`Config::load`])
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ROSTER_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(key) = lookup("ROSTER_DB_KEY") {
            self.database.encryption_key = Some(key);
        }
        if let Some(bind) = lookup("ROSTER_BIND") {
            self.server.bind = bind;
        }
        if let Some(size) = lookup("ROSTER_POOL_MAX_SIZE") {
            self.pool.max_size = parse_number("ROSTER_POOL_MAX_SIZE", &size)?;
        }
        if let Some(secs) = lookup("ROSTER_POOL_MAX_LIFETIME_SECS") {
            self.pool.max_lifetime_secs = parse_number("ROSTER_POOL_MAX_LIFETIME_SECS", &secs)?;
        }
        Ok(())
    }

    /// Make a relative database path relative to the roster directory
    pub fn resolve_paths(&mut self, roster_dir: &Path) {
        if !self.database.is_in_memory() && self.database.path.is_relative() {
            self.database.path = roster_dir.join(&self.database.path);
        }
    }

    /// Reject settings that can never produce a working service
    pub fn validate(&self) -> Result<()> {
        if self.pool.max_size == 0 {
            return Err(Error::config("pool.maxSize must be at least 1"));
        }
        if self.pool.max_lifetime_secs == 0 {
            return Err(Error::config("pool.maxLifetimeSecs must be at least 1"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(Error::config("server.requestTimeoutSecs must be at least 1"));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::config("database.path must not be empty"));
        }
        if let Some(key) = &self.database.encryption_key {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::config("database encryption key must be hex encoded"));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{key} must be a number, got {value:?}")))
}
