//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case.

pub mod migration;
mod registration;

pub use migration::{MigrationResult, MigrationService};
pub use registration::RegistrationService;
