//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the AccountStore port
//! - Argon2id for the CredentialHasher port
//! - axum for the inbound HTTP API

pub mod argon2;
pub mod duckdb;
pub mod http;
