//! SQLite connection and schema
//!
//! One connection behind a mutex. SQLite serializes writers anyway, and
//! every multi-row change runs in a single transaction.

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::store::error::{StoreError, StoreResult};

/// Schema version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    full_name     TEXT NOT NULL,
    role          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    salt          TEXT NOT NULL,
    created_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_sessions (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id                TEXT PRIMARY KEY,
    borrower_id       TEXT NOT NULL REFERENCES users(id),
    status            TEXT NOT NULL,
    product_type      TEXT NOT NULL,
    loan_amount       REAL NOT NULL,
    term_months       INTEGER NOT NULL,
    apr               REAL NOT NULL,
    monthly_payment   REAL NOT NULL,
    loan_purpose      TEXT NOT NULL,
    business_name     TEXT NOT NULL,
    business_type     TEXT NOT NULL,
    industry          TEXT NOT NULL,
    ein               TEXT NOT NULL,
    years_in_business INTEGER NOT NULL,
    address           TEXT NOT NULL,
    city              TEXT NOT NULL,
    state             TEXT NOT NULL,
    zip               TEXT NOT NULL,
    annual_revenue    REAL NOT NULL,
    monthly_revenue   REAL NOT NULL,
    existing_debt     REAL NOT NULL,
    credit_score      INTEGER NOT NULL,
    first_name        TEXT NOT NULL,
    last_name         TEXT NOT NULL,
    contact_email     TEXT NOT NULL,
    phone             TEXT NOT NULL,
    funded_amount     REAL NOT NULL DEFAULT 0,
    funding_status    TEXT NOT NULL DEFAULT 'unfunded',
    admin_notes       TEXT,
    submitted_at      INTEGER NOT NULL,
    updated_at        INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_applications_borrower ON applications(borrower_id);
CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);

CREATE TABLE IF NOT EXISTS investments (
    id             TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(id),
    investor_id    TEXT NOT NULL REFERENCES users(id),
    amount         REAL NOT NULL,
    percentage     REAL NOT NULL,
    created_at     INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_investments_application ON investments(application_id);
CREATE INDEX IF NOT EXISTS idx_investments_investor ON investments(investor_id);

CREATE TABLE IF NOT EXISTS status_history (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id TEXT NOT NULL REFERENCES applications(id),
    from_status    TEXT,
    to_status      TEXT NOT NULL,
    changed_by     TEXT,
    note           TEXT,
    changed_at     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id             TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(id),
    uploaded_by    TEXT NOT NULL REFERENCES users(id),
    file_name      TEXT NOT NULL,
    content_type   TEXT NOT NULL,
    size_bytes     INTEGER NOT NULL,
    storage_key    TEXT NOT NULL,
    created_at     INTEGER NOT NULL
);
"#;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: PathBuf,
    /// How long a writer waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("lendbridge_data").join("lendbridge.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Handle to the marketplace database
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (and create if needed) the database at `config.path`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Configured SQLite journal");

        let store = Self::init(conn, Some(config.path.clone()))?;
        tracing::info!(path = ?config.path, "Opened marketplace database");
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file path (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Cheap round trip used by readiness checks
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

fn migrate(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::Corruption(format!(
            "database schema version {} is newer than supported {}",
            version, SCHEMA_VERSION
        )));
    }

    conn.execute_batch(SCHEMA)?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::debug!(from = version, to = SCHEMA_VERSION, "Migrated database schema");
    }
    Ok(())
}

/// Decode a UUID column
pub(crate) fn parse_uuid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| StoreError::Corruption(format!("bad uuid '{}': {}", value, e)))
}

/// Decode an enum column through its `FromStr` impl
pub(crate) fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corruption(e.to_string()))
}
