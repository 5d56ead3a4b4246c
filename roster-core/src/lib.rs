//! Roster Core - user registration pipeline
//!
//! This crate implements the registration logic following hexagonal architecture:
//!
//! - **domain**: Registration values, validation rules, outcomes
//! - **ports**: Trait definitions for storage and password hashing
//! - **services**: The registration pipeline and schema migrations
//! - **adapters**: Concrete implementations (DuckDB, Argon2id, axum)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use adapters::argon2::Argon2Hasher;
use adapters::duckdb::DuckDbAccountStore;
use config::Config;
use services::RegistrationService;

// Re-export commonly used types at crate root
pub use domain::{
    AccountRecord, OutcomeKind, RegistrationInput, RegistrationOutcome, Stage, ValidationFailure,
};
pub use domain::result::{Error, Result};
pub use services::MigrationResult;

/// Main context for Roster operations
///
/// Holds the configuration, the adapters and the registration service,
/// wired together. The schema is up to date once construction succeeds.
pub struct RosterContext {
    pub config: Config,
    pub store: Arc<DuckDbAccountStore>,
    pub hasher: Arc<Argon2Hasher>,
    pub registration_service: Arc<RegistrationService>,
    /// Migrations applied while opening the store
    pub migrations: MigrationResult,
}

impl RosterContext {
    /// Load `settings.json` from `roster_dir` and build the context
    pub async fn new(roster_dir: &Path) -> Result<Self> {
        let config = Config::load(roster_dir)?;
        Self::with_config(config).await
    }

    /// Build the context from an already loaded configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        let store = Arc::new(DuckDbAccountStore::open(&config.database, &config.pool)?);
        let migrations = store.ensure_schema().await?;

        let hasher = Arc::new(Argon2Hasher::new(&config.hasher)?);
        let registration_service = Arc::new(RegistrationService::new(
            Arc::clone(&store) as Arc<dyn ports::AccountStore>,
            Arc::clone(&hasher) as Arc<dyn ports::CredentialHasher>,
        ));

        Ok(Self {
            config,
            store,
            hasher,
            registration_service,
            migrations,
        })
    }

    /// Run the registration pipeline once
    pub async fn register(&self, input: RegistrationInput) -> RegistrationOutcome {
        self.registration_service.register(input).await
    }

    /// Serve the HTTP API on the configured address until Ctrl-C
    pub async fn serve(&self) -> Result<()> {
        adapters::http::serve(Arc::clone(&self.registration_service), &self.config.server).await
    }
}
