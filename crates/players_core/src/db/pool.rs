//! Writer connection plus a pool of reader connections over one file.
//!
//! # Responsibility
//! - Serialize writes through a single writer connection.
//! - Let several readers query concurrently from WAL snapshots.
//!
//! # Invariants
//! - The database file is always in WAL journal mode.
//! - No more than `max_reader_count` reader connections exist at once.
//! - Reader connections are opened read-only.
//! - `opened` stays accurate even after a panic poisoned the slot lock; no
//!   user code runs while that lock is held.

use super::access::{run_snapshot_read, run_write, DatabaseReader, DatabaseWriter};
use super::{Configuration, DbError, DbResult, JournalMode, Storage};
use log::info;
use rusqlite::{Connection, Transaction};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Database handle for file storage with concurrent readers.
pub struct DatabasePool {
    writer: Mutex<Connection>,
    readers: Mutex<ReaderSlots>,
    reader_released: Condvar,
    config: Configuration,
}

struct ReaderSlots {
    idle: Vec<Connection>,
    /// Reader connections currently opened, idle or checked out.
    opened: usize,
}

impl DatabasePool {
    /// Opens a pool over the file named by `config`.
    ///
    /// # Errors
    /// - `InvalidConfiguration` for in-memory storage or a zero reader limit.
    pub fn open(mut config: Configuration) -> DbResult<Self> {
        if !matches!(config.storage, Storage::File(_)) {
            return Err(DbError::InvalidConfiguration(
                "database pool requires file storage".to_string(),
            ));
        }
        if config.max_reader_count == 0 {
            return Err(DbError::InvalidConfiguration(
                "max_reader_count must be at least 1".to_string(),
            ));
        }
        config.journal_mode = Some(JournalMode::Wal);

        let writer = config.open_writer()?;
        info!(
            "event=db_open module=db status=ok handle=pool mode=file max_readers={}",
            config.max_reader_count
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Mutex::new(ReaderSlots {
                idle: Vec::new(),
                opened: 0,
            }),
            reader_released: Condvar::new(),
            config,
        })
    }

    fn writer(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| DbError::LockPoisoned("database pool writer"))
    }

    fn reader_slots(&self) -> MutexGuard<'_, ReaderSlots> {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checkout_reader(&self) -> DbResult<Connection> {
        let mut slots = self.reader_slots();
        loop {
            if let Some(conn) = slots.idle.pop() {
                return Ok(conn);
            }
            if slots.opened < self.config.max_reader_count {
                slots.opened += 1;
                drop(slots);
                return self.config.open_reader().map_err(|err| {
                    self.reader_slots().opened -= 1;
                    self.reader_released.notify_one();
                    err
                });
            }
            slots = self
                .reader_released
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release_reader(&self, conn: Connection) {
        self.reader_slots().idle.push(conn);
        self.reader_released.notify_one();
    }

    /// Number of reader connections opened so far.
    pub fn reader_count(&self) -> usize {
        self.reader_slots().opened
    }
}

impl DatabaseReader for DatabasePool {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.checkout_reader()?;
        let result = run_snapshot_read(&mut conn, f);
        self.release_reader(conn);
        result
    }
}

impl DatabaseWriter for DatabasePool {
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.writer()?;
        run_write(&mut conn, f)
    }

    fn write_without_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.writer()?;
        f(&mut *conn)
    }

    fn configuration(&self) -> &Configuration {
        &self.config
    }
}
