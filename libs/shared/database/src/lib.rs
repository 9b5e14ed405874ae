//! Storage layer for the clinic backend.
//!
//! Every cell talks to SQLite through [`ClinicStore`], which hands out a
//! scoped, mutually exclusive handle per operation. Holding the handle across
//! a check-then-write sequence is what gives the scheduling engine its
//! atomicity; the partial unique index in [`schema::SCHEMA`] backstops the
//! same invariant at commit time.

mod schema;

pub use schema::SCHEMA;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use shared_config::AppConfig;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage handle poisoned by a panicking writer")]
    Poisoned,
}

impl DbError {
    /// True when the underlying SQLite error is a constraint violation
    /// (unique index, foreign key, CHECK). Callers map these to their own
    /// domain errors, e.g. a slot conflict.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Raw connection access for cell-level queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

/// Shared handle to the clinic database.
///
/// Cheap to clone; each service holds its own handle. All access goes
/// through [`ClinicStore::with`] or
/// [`ClinicStore::with_mut`] so the handle is acquired, used, and released
/// within a single scope.
#[derive(Clone)]
pub struct ClinicStore {
    inner: Arc<Mutex<Database>>,
}

impl ClinicStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Database::open(path)?)),
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Database::open_in_memory()?)),
        })
    }

    pub fn from_config(config: &AppConfig) -> DbResult<Self> {
        debug!("Opening clinic store at {}", config.database_path);
        if config.is_persistent() {
            Self::open(&config.database_path)
        } else {
            Self::open_in_memory()
        }
    }

    /// Run a read or single-statement write under the store lock.
    ///
    /// The closure's whole body executes with exclusive access, so a
    /// check-then-insert sequence inside one `with` call cannot interleave
    /// with another caller's.
    pub fn with<T, E>(&self, f: impl FnOnce(&Database) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let guard = self.inner.lock().map_err(|_| E::from(DbError::Poisoned))?;
        f(&guard)
    }

    /// Like [`ClinicStore::with`], for operations that need a transaction.
    pub fn with_mut<T, E>(&self, f: impl FnOnce(&mut Database) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut guard = self.inner.lock().map_err(|_| E::from(DbError::Poisoned))?;
        f(&mut guard)
    }
}

/// Application state shared across all routers.
pub struct AppState {
    pub config: AppConfig,
    pub store: ClinicStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> DbResult<Self> {
        let store = ClinicStore::from_config(&config)?;
        Ok(Self { config, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"clinicians".to_string()));
        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"availability_windows".to_string()));
        assert!(tables.contains(&"appointments".to_string()));
        assert!(tables.contains(&"encounters".to_string()));
    }

    #[test]
    fn test_store_scoped_access() {
        let store = ClinicStore::open_in_memory().unwrap();

        let count: i64 = store
            .with::<_, DbError>(|db| {
                db.conn()
                    .query_row("SELECT COUNT(*) FROM clinicians", [], |row| row.get(0))
                    .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let store = ClinicStore::open(&path).unwrap();
        drop(store);
        assert!(path.exists());
    }

    #[test]
    fn test_constraint_violation_detection() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO clinicians (id, full_name, email, specialty, created_at, updated_at)
                 VALUES (x'01', 'Dr. A', 'a@clinic.test', 'Cardiology', '', '')",
                [],
            )
            .unwrap();
        let err: DbError = db
            .conn()
            .execute(
                "INSERT INTO clinicians (id, full_name, email, specialty, created_at, updated_at)
                 VALUES (x'02', 'Dr. B', 'a@clinic.test', 'Neurology', '', '')",
                [],
            )
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation());
    }
}
