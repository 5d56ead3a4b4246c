//! DuckDB account store
//!
//! Connections come from a bounded deadpool pool. Every pooled connection is
//! a `try_clone` of one root connection, so they all share a single database
//! instance (including `:memory:` databases and encrypted attachments).

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use duckdb::{params, Connection, OptionalExt};

use crate::config::{DatabaseSettings, PoolSettings};
use crate::domain::result::{Error, Result};
use crate::domain::{AccountRecord, NewAccount};
use crate::ports::{AccountStore, InsertOutcome};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Lookups of the email after an aborted insert, before calling it a storage error
const CONFLICT_LOOKUPS: u32 = 3;

const CONFLICT_LOOKUP_DELAY_MS: u64 = 10;

/// Text form of `created_at`, as produced by `created_at::VARCHAR`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const INSERT_ACCOUNT_SQL: &str = "INSERT INTO users (first_name, last_name, email, password_hash) \
     VALUES (?, ?, ?, ?) \
     ON CONFLICT (email) DO NOTHING \
     RETURNING id, created_at::VARCHAR";

const SELECT_ACCOUNT_SQL: &str = "SELECT id, first_name, last_name, email, password_hash, created_at::VARCHAR \
     FROM users WHERE email = ?";

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Database(e.to_string())
    }
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

/// Hands out clones of a root connection and retires them by age
pub struct DuckDbConnectionManager {
    root: Mutex<Connection>,
    encrypted: bool,
    max_lifetime: Duration,
}

impl DuckDbConnectionManager {
    fn new(root: Connection, encrypted: bool, max_lifetime: Duration) -> Self {
        Self {
            root: Mutex::new(root),
            encrypted,
            max_lifetime,
        }
    }
}

impl managed::Manager for DuckDbConnectionManager {
    type Type = Connection;
    type Error = Error;

    async fn create(&self) -> Result<Connection> {
        let conn = {
            let root = self
                .root
                .lock()
                .map_err(|_| Error::pool("root connection lock poisoned"))?;
            root.try_clone()?
        };
        if self.encrypted {
            // The default schema is per connection; point clones at the attachment
            conn.execute_batch("USE main_db")?;
        }
        Ok(conn)
    }

    async fn recycle(&self, _conn: &mut Connection, metrics: &Metrics) -> RecycleResult<Error> {
        if metrics.age() > self.max_lifetime {
            return Err(RecycleError::Message("connection exceeded max lifetime".into()));
        }
        Ok(())
    }
}

pub type DuckDbPool = managed::Pool<DuckDbConnectionManager>;

/// Account store backed by DuckDB
///
/// Email uniqueness is enforced by the `UNIQUE` constraint on `users.email`.
/// The store never checks for an existing email before inserting.
#[derive(Clone)]
pub struct DuckDbAccountStore {
    pool: DuckDbPool,
}

impl DuckDbAccountStore {
    /// Open (or create) the database and build the connection pool.
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock. Does not touch the schema; call [`ensure_schema`] next.
    ///
    /// [`ensure_schema`]: DuckDbAccountStore::ensure_schema
    pub fn open(database: &DatabaseSettings, pool: &PoolSettings) -> Result<Self> {
        let root = open_with_retry(database)?;
        let manager = DuckDbConnectionManager::new(
            root,
            database.encryption_key.is_some(),
            pool.max_lifetime(),
        );
        let pool = managed::Pool::builder(manager)
            .max_size(pool.max_size)
            .wait_timeout(Some(pool.wait_timeout()))
            .runtime(deadpool::Runtime::Tokio1)
            .build()
            .map_err(|e| Error::pool(e.to_string()))?;

        tracing::debug!(path = %database.path.display(), "opened account database");
        Ok(Self { pool })
    }

    /// Private in-memory store with default pool limits
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseSettings::in_memory(), &PoolSettings::default())
    }

    /// Apply pending schema migrations
    pub async fn ensure_schema(&self) -> Result<MigrationResult> {
        self.with_connection(|conn| MigrationService::new(conn).run_pending())
            .await
    }

    /// Names of migrations not yet applied
    pub async fn pending_migrations(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| MigrationService::new(conn).get_pending())
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        let email = email.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached(SELECT_ACCOUNT_SQL)?;
            let row = stmt
                .query_row([email.as_str()], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })
                .optional()?;

            row.map(|(id, first_name, last_name, email, password_hash, created_at)| {
                Ok(AccountRecord {
                    id,
                    first_name,
                    last_name,
                    email,
                    password_hash,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    pub async fn count_accounts(&self) -> Result<i64> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
    }

    /// Run `f` against one pooled connection on the blocking thread pool.
    ///
    /// Waits up to the pool's wait timeout for a free connection. The
    /// connection goes back to the pool when `f` returns.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::pool(e.to_string()))?;

        tokio::task::spawn_blocking(move || f(&conn))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl AccountStore for DuckDbAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<InsertOutcome> {
        self.with_connection(move |conn| insert_account(conn, account))
            .await
    }
}

fn insert_account(conn: &Connection, account: NewAccount) -> Result<InsertOutcome> {
    let error = match try_insert(conn, &account) {
        Ok(Some((id, created_at))) => {
            return Ok(InsertOutcome::Created(AccountRecord {
                id,
                first_name: account.first_name,
                last_name: account.last_name,
                email: account.email,
                password_hash: account.password_hash,
                created_at: parse_timestamp(&created_at)?,
            }));
        }
        // ON CONFLICT DO NOTHING returned no row: the email was already committed
        Ok(None) => return Ok(InsertOutcome::DuplicateEmail),
        Err(e) => e,
    };

    // A concurrent insert of the same email that had not committed yet
    // aborts the statement instead of hitting ON CONFLICT. If that writer
    // commits, its row shows up here shortly; the insert is never re-run.
    for attempt in 1..=CONFLICT_LOOKUPS {
        if email_exists(conn, &account.email)? {
            tracing::debug!(error = %error, "insert lost a uniqueness race");
            return Ok(InsertOutcome::DuplicateEmail);
        }
        if attempt < CONFLICT_LOOKUPS {
            thread::sleep(Duration::from_millis(CONFLICT_LOOKUP_DELAY_MS * u64::from(attempt)));
        }
    }
    Err(error.into())
}

fn try_insert(conn: &Connection, account: &NewAccount) -> duckdb::Result<Option<(i64, String)>> {
    let mut stmt = conn.prepare_cached(INSERT_ACCOUNT_SQL)?;
    stmt.query_row(
        params![
            account.first_name,
            account.last_name,
            account.email,
            account.password_hash
        ],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )
    .optional()
}

fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?",
        [email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|ts| ts.and_utc())
        .map_err(|e| Error::database(format!("invalid created_at {value:?}: {e}")))
}

fn open_with_retry(database: &DatabaseSettings) -> Result<Connection> {
    let mut attempt = 0;
    loop {
        match try_open_connection(database) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                let err_msg = e.to_string();
                attempt += 1;
                if !is_retryable_error(&err_msg) || attempt >= MAX_RETRIES {
                    return Err(e);
                }
                let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                tracing::warn!(
                    attempt,
                    max_attempts = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    error = %err_msg,
                    "database busy, retrying"
                );
                thread::sleep(delay);
            }
        }
    }
}

fn try_open_connection(database: &DatabaseSettings) -> Result<Connection> {
    // Extension autoloading stays off; nothing here needs an extension
    let config = duckdb::Config::default().enable_autoload_extension(false)?;

    if database.is_in_memory() {
        return Ok(Connection::open_in_memory_with_flags(config)?);
    }

    match &database.encryption_key {
        Some(key) => {
            // Encrypted database: open in-memory first, then ATTACH the file
            let conn = Connection::open_in_memory_with_flags(config)?;
            conn.execute_batch(&format!(
                "ATTACH '{}' AS main_db (ENCRYPTION_KEY '{}')",
                sql_quote(&database.path),
                key.replace('\'', "''")
            ))?;
            conn.execute_batch("USE main_db")?;
            Ok(conn)
        }
        None => Ok(Connection::open_with_flags(&database.path, config)?),
    }
}

fn sql_quote(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}
