//! Registration service - runs one registration request end to end
//!
//! `Received -> Normalized -> Validated -> Hashed -> Persisted`, strictly in
//! that order, with no retries. Each call is independent; the only ordering
//! point between concurrent calls is the store's uniqueness constraint.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{InternalFailure, RegistrationInput, RegistrationOutcome, Stage, ValidatedInput};
use crate::ports::{AccountStore, CredentialHasher, InsertOutcome};

/// Registration pipeline orchestrator
pub struct RegistrationService {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn AccountStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Run the pipeline for one submission. Never fails: every error becomes
    /// one of the four outcomes.
    pub async fn register(&self, input: RegistrationInput) -> RegistrationOutcome {
        let span = tracing::info_span!("register", request_id = %Uuid::new_v4());
        self.run(input).instrument(span).await
    }

    async fn run(&self, input: RegistrationInput) -> RegistrationOutcome {
        let normalized = input.normalize();
        tracing::debug!(stage = %Stage::Normalized, "input normalized");

        let validated = match normalized.validate() {
            Ok(validated) => validated,
            Err(failure) => {
                tracing::info!(field = failure.field(), reason = %failure, "registration rejected");
                return RegistrationOutcome::Invalid(failure);
            }
        };
        tracing::debug!(stage = %Stage::Validated, "input validated");

        let (validated, password_hash) = match self.hash(validated).await {
            Ok(hashed) => hashed,
            Err(e) => return internal(Stage::Hashed, &e),
        };
        tracing::debug!(stage = %Stage::Hashed, "password hashed");

        match self.store.insert(validated.into_account(password_hash)).await {
            Ok(InsertOutcome::Created(record)) => {
                tracing::info!(account_id = record.id, "account registered");
                RegistrationOutcome::Registered(record)
            }
            Ok(InsertOutcome::DuplicateEmail) => {
                tracing::info!("registration rejected: email already exists");
                RegistrationOutcome::Conflict
            }
            Err(e) => internal(Stage::Persisted, &e),
        }
    }

    /// Hash on the blocking pool so slow hashes don't stall other requests
    async fn hash(&self, validated: ValidatedInput) -> Result<(ValidatedInput, String)> {
        let hasher = Arc::clone(&self.hasher);
        let (validated, hash) = tokio::task::spawn_blocking(move || {
            let hash = hasher.hash(validated.password());
            (validated, hash)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?;

        Ok((validated, hash?))
    }
}

fn internal(stage: Stage, error: &Error) -> RegistrationOutcome {
    let failure = InternalFailure::new(stage, error);
    tracing::error!(stage = %failure.stage, detail = %failure.detail, "registration failed");
    RegistrationOutcome::Internal(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountRecord, NewAccount, OutcomeKind, ValidationFailure};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records inserts; answers DuplicateEmail for emails it has seen
    #[derive(Default)]
    struct RecordingStore {
        inserted: Mutex<Vec<NewAccount>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl AccountStore for RecordingStore {
        async fn insert(&self, account: NewAccount) -> Result<InsertOutcome> {
            if let Some(msg) = &self.fail_with {
                return Err(Error::database(msg.clone()));
            }
            let mut inserted = self.inserted.lock().unwrap();
            if inserted.iter().any(|a| a.email == account.email) {
                return Ok(InsertOutcome::DuplicateEmail);
            }
            inserted.push(account.clone());
            Ok(InsertOutcome::Created(AccountRecord {
                id: inserted.len() as i64,
                first_name: account.first_name,
                last_name: account.last_name,
                email: account.email,
                password_hash: account.password_hash,
                created_at: Utc::now(),
            }))
        }
    }

    /// Deterministic stand-in; counts calls
    #[derive(Default)]
    struct FakeHasher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CredentialHasher for FakeHasher {
        fn hash(&self, password: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::hashing("entropy source unavailable"));
            }
            Ok(format!("hashed:{}", password.len()))
        }

        fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
            Ok(password_hash == format!("hashed:{}", password.len()))
        }
    }

    fn service(store: Arc<RecordingStore>, hasher: Arc<FakeHasher>) -> RegistrationService {
        RegistrationService::new(store, hasher)
    }

    fn john() -> RegistrationInput {
        RegistrationInput::new("  John ", " Doe", " John@Example.COM ", "Secret123")
    }

    #[tokio::test]
    async fn test_register_success_normalizes_and_hashes() {
        let store = Arc::new(RecordingStore::default());
        let hasher = Arc::new(FakeHasher::default());
        let outcome = service(store.clone(), hasher.clone()).register(john()).await;

        let record = outcome.account().expect("registered");
        assert_eq!(record.first_name, "John");
        assert_eq!(record.last_name, "Doe");
        assert_eq!(record.email, "john@example.com");
        assert_eq!(outcome.message(), "registered");

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].password_hash, "hashed:9");
        assert_ne!(inserted[0].password_hash, "Secret123");
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_hash_and_store() {
        let store = Arc::new(RecordingStore::default());
        let hasher = Arc::new(FakeHasher::default());
        let svc = service(store.clone(), hasher.clone());

        let outcome = svc
            .register(RegistrationInput::new("J", "Doe", "john@example.com", "Secret123"))
            .await;

        assert!(matches!(
            outcome,
            RegistrationOutcome::Invalid(ValidationFailure::FirstNameTooShort)
        ));
        assert_eq!(outcome.message(), "first_name too short");
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 0);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_failing_rule_wins() {
        let svc = service(Arc::default(), Arc::default());
        let outcome = svc
            .register(RegistrationInput::new("John", "D", "not-an-email", "weak"))
            .await;
        assert_eq!(outcome.message(), "last_name too short");
    }

    #[tokio::test]
    async fn test_weak_password_rejected_before_hashing() {
        let store = Arc::new(RecordingStore::default());
        let hasher = Arc::new(FakeHasher::default());
        let svc = service(store.clone(), hasher.clone());

        let outcome = svc
            .register(RegistrationInput::new("John", "Doe", "john@example.com", "weakpass"))
            .await;

        assert!(matches!(
            outcome,
            RegistrationOutcome::Invalid(ValidationFailure::WeakPassword)
        ));
        assert_eq!(outcome.message(), "weak password (8+, upper, lower, digit)");
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 0);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), Arc::default());

        assert!(svc.register(john()).await.is_registered());
        let second = svc
            .register(RegistrationInput::new("Jane", "Roe", "JOHN@example.com", "Other456"))
            .await;

        assert_eq!(second.kind(), OutcomeKind::Conflict);
        assert_eq!(second.message(), "email already exists");
        assert_eq!(store.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hash_failure_is_internal_at_hash_stage() {
        let store = Arc::new(RecordingStore::default());
        let hasher = Arc::new(FakeHasher {
            fail: true,
            ..FakeHasher::default()
        });
        let outcome = service(store.clone(), hasher).register(john()).await;

        match &outcome {
            RegistrationOutcome::Internal(failure) => {
                assert_eq!(failure.stage, Stage::Hashed);
                assert!(failure.detail.contains("entropy"));
            }
            other => panic!("expected internal failure, got {:?}", other),
        }
        assert_eq!(outcome.message(), "internal error");
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_at_persist_stage() {
        let store = Arc::new(RecordingStore {
            fail_with: Some("IO Error: disk full".to_string()),
            ..RecordingStore::default()
        });
        let outcome = service(store, Arc::default()).register(john()).await;

        match &outcome {
            RegistrationOutcome::Internal(failure) => {
                assert_eq!(failure.stage, Stage::Persisted);
                assert!(failure.detail.contains("disk full"));
            }
            other => panic!("expected internal failure, got {:?}", other),
        }
        assert!(!outcome.message().contains("disk"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_emails_all_succeed() {
        let store = Arc::new(RecordingStore::default());
        let svc = Arc::new(service(store.clone(), Arc::default()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move {
                    svc.register(RegistrationInput::new(
                        "John",
                        "Doe",
                        format!("user{}@example.com", i),
                        "Secret123",
                    ))
                    .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_registered());
        }
        assert_eq!(store.inserted.lock().unwrap().len(), 8);
    }
}
