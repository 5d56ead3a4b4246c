//! End-to-end registration tests
//!
//! The full pipeline against a real DuckDB store and the real Argon2id
//! hasher (with a cheap work factor).
//!
//! Run with: cargo test --test registration_pipeline_test -- --nocapture

use tempfile::TempDir;

use roster_core::config::{Config, DatabaseSettings, HasherSettings};
use roster_core::ports::CredentialHasher;
use roster_core::{OutcomeKind, RegistrationInput, RegistrationOutcome, RosterContext, ValidationFailure};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config(database: DatabaseSettings) -> Config {
    Config {
        database,
        hasher: HasherSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        ..Config::default()
    }
}

async fn in_memory_context() -> RosterContext {
    RosterContext::with_config(test_config(DatabaseSettings::in_memory()))
        .await
        .expect("Failed to create context")
}

fn john() -> RegistrationInput {
    RegistrationInput::new("  John ", "Doe", " John@Example.com ", "Secret123")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_register_persists_normalized_account() {
    let ctx = in_memory_context().await;

    let outcome = ctx.register(john()).await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert_eq!(outcome.message(), "registered");

    let stored = ctx
        .store
        .find_by_email("john@example.com")
        .await
        .unwrap()
        .expect("account stored");
    assert_eq!(stored.first_name, "John");
    assert_eq!(stored.last_name, "Doe");
    assert_eq!(Some(&stored), outcome.account());

    // The stored hash verifies the original password and nothing else
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(ctx.hasher.verify("Secret123", &stored.password_hash).unwrap());
    assert!(!ctx.hasher.verify("Secret124", &stored.password_hash).unwrap());
}

#[tokio::test]
async fn test_resubmission_is_conflict_and_keeps_original() {
    let ctx = in_memory_context().await;

    let first = ctx.register(john()).await;
    let original = first.account().cloned().expect("first registration succeeds");

    let second = ctx
        .register(RegistrationInput::new("Johnny", "Doe", "JOHN@example.com", "Another99"))
        .await;
    assert!(matches!(second, RegistrationOutcome::Conflict));
    assert_eq!(second.message(), "email already exists");

    assert_eq!(ctx.store.count_accounts().await.unwrap(), 1);
    let stored = ctx.store.find_by_email("john@example.com").await.unwrap().unwrap();
    assert_eq!(stored, original);
}

#[tokio::test]
async fn test_validation_failures_store_nothing() {
    let ctx = in_memory_context().await;

    let cases = [
        (RegistrationInput::new(" J ", "Doe", "john@example.com", "Secret123"), ValidationFailure::FirstNameTooShort),
        (RegistrationInput::new("John", "", "john@example.com", "Secret123"), ValidationFailure::LastNameTooShort),
        (RegistrationInput::new("John", "Doe", "john@example", "Secret123"), ValidationFailure::InvalidEmail),
        (RegistrationInput::new("John", "Doe", "john@example.com", "weakpass"), ValidationFailure::WeakPassword),
    ];

    for (input, expected) in cases {
        match ctx.register(input).await {
            RegistrationOutcome::Invalid(failure) => assert_eq!(failure, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }

    assert_eq!(ctx.store.count_accounts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ids_increase_across_registrations() {
    let ctx = in_memory_context().await;

    let mut last_id = 0;
    for name in ["alice", "bob", "carol"] {
        let outcome = ctx
            .register(RegistrationInput::new("Test", "User", format!("{}@example.com", name), "Secret123"))
            .await;
        let record = outcome.account().expect("registered");
        assert!(record.id > last_id);
        last_id = record.id;
    }
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings {
        path: temp_dir.path().join("roster.duckdb"),
        encryption_key: None,
    };

    {
        let ctx = RosterContext::with_config(test_config(settings.clone())).await.unwrap();
        assert!(!ctx.migrations.applied.is_empty());
        assert!(ctx.register(john()).await.is_registered());
    }

    let ctx = RosterContext::with_config(test_config(settings)).await.unwrap();
    assert!(ctx.migrations.applied.is_empty());
    assert_eq!(ctx.store.count_accounts().await.unwrap(), 1);
    assert_eq!(ctx.register(john()).await.kind(), OutcomeKind::Conflict);
}

#[tokio::test]
async fn test_context_loads_settings_from_dir() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{ "hasher": { "memoryKib": 1024, "iterations": 1, "parallelism": 1 } }"#,
    )
    .unwrap();

    let ctx = RosterContext::new(temp_dir.path()).await.unwrap();
    assert_eq!(ctx.config.hasher.memory_kib, 1024);
    assert!(ctx.register(john()).await.is_registered());
}
