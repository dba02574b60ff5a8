pub mod migrations;
pub mod models;
pub mod queries;

use rusqlite::{Connection, ErrorCode, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use models::{AccountRow, NewPost, PostChanges, PostRow};

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A UNIQUE constraint rejected the write. `column` is the bare column name.
    #[error("duplicate value for unique column `{column}`")]
    Duplicate { column: String },

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                // SQLite reports "UNIQUE constraint failed: accounts.username"
                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    let first = columns.split(", ").next().unwrap_or(columns);
                    let column = first.rsplit('.').next().unwrap_or(first);
                    return DbError::Duplicate {
                        column: column.to_string(),
                    };
                }
            }
        }
        DbError::Sqlite(err)
    }
}

/// Record store handle. Constructed explicitly and shared through the API state;
/// the single connection behind the mutex is the write serialization point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits when `f` succeeds; any error drops
    /// the transaction, which rolls it back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}
