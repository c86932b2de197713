//! Single-connection database handle.
//!
//! # Responsibility
//! - Serialize every read and write through one SQLite connection.
//!
//! # Invariants
//! - The connection is only reachable while holding the queue mutex.

use super::access::{run_snapshot_read, run_write, DatabaseReader, DatabaseWriter};
use super::{Configuration, DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};
use std::sync::{Mutex, MutexGuard};

/// Database handle backed by a single connection.
///
/// Works for both in-memory and file storage. Reads wait for writes and for
/// each other; use `DatabasePool` for concurrent reads on a file.
pub struct DatabaseQueue {
    conn: Mutex<Connection>,
    config: Configuration,
}

impl DatabaseQueue {
    /// Opens a private in-memory database with the default configuration.
    pub fn new() -> DbResult<Self> {
        Self::open(Configuration::default())
    }

    /// Opens a queue with the given configuration.
    pub fn open(config: Configuration) -> DbResult<Self> {
        let conn = config.open_writer()?;
        info!(
            "event=db_open module=db status=ok handle=queue mode={}",
            config.mode_label()
        );
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DbError::LockPoisoned("database queue"))
    }
}

impl DatabaseReader for DatabaseQueue {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.connection()?;
        run_snapshot_read(&mut conn, f)
    }
}

impl DatabaseWriter for DatabaseQueue {
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.connection()?;
        run_write(&mut conn, f)
    }

    fn write_without_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.connection()?;
        f(&mut *conn)
    }

    fn configuration(&self) -> &Configuration {
        &self.config
    }
}
