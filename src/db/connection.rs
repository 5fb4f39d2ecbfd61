//! Database connection management
//!
//! Wraps the SQLite file in a single-connection pool. All writes go through
//! `with_transaction`, which commits on success and rolls back on any error.

use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OpenFlags, Transaction};
use thiserror::Error;
use tracing::{debug, info};

/// Database error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Handle to the nutrition database file
///
/// Only one writer is expected, so the pool holds a single connection.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database file
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|conn| {
                // DELETE journal: the shipped file must not depend on -wal/-shm sidecars
                conn.execute_batch(
                    "PRAGMA journal_mode = DELETE;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA cache_size = -64000;
                     PRAGMA temp_store = MEMORY;",
                )?;
                Ok(())
            });

        let pool = Pool::builder().max_size(1).build(manager)?;
        debug!(path = %path.display(), "opened nutrition database");

        Ok(Self { pool, path })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Execute a closure with a database connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// Run a closure inside one transaction
    ///
    /// The transaction is committed only if the closure returns `Ok`; any
    /// early return drops it, which rolls back.
    pub fn with_transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Close the database, releasing the file
    pub fn close(self) {
        info!(path = %self.path.display(), "closing nutrition database");
        drop(self.pool);
    }
}
