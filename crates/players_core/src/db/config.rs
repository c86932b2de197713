//! Connection configuration for SQLite storage handles.
//!
//! # Responsibility
//! - Describe where a database lives (memory or file) and how its
//!   connections are set up (pragmas, busy timeout, journal mode).
//! - Open and bootstrap individual connections from that description.
//!
//! # Invariants
//! - Every connection opened from a `Configuration` gets the same pragmas.
//! - Reader connections never get write access to the file.

use super::{DbError, DbResult};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_READER_COUNT: usize = 5;

/// Backing storage for a database handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Private in-memory database, discarded when the handle is dropped.
    InMemory,
    /// Durable database file.
    File(PathBuf),
}

/// SQLite journal modes the handles know how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Wal,
}

impl JournalMode {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Wal => "WAL",
        }
    }
}

/// Connection parameters shared by every connection of one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub storage: Storage,
    /// Opens the database read-only. Migrations cannot run on such handles.
    pub read_only: bool,
    pub busy_timeout: Duration,
    /// `None` keeps the SQLite default for the storage kind.
    pub journal_mode: Option<JournalMode>,
    pub foreign_keys: bool,
    /// Extra `PRAGMA name = value` statements, applied in order.
    pub pragmas: Vec<(String, String)>,
    /// Upper bound of reader connections kept by `DatabasePool`.
    pub max_reader_count: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            storage: Storage::InMemory,
            read_only: false,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: None,
            foreign_keys: true,
            pragmas: Vec::new(),
            max_reader_count: DEFAULT_MAX_READER_COUNT,
        }
    }
}

impl Configuration {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            storage: Storage::File(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn with_pragma(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pragmas.push((name.into(), value.into()));
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.storage == Storage::InMemory
    }

    pub(crate) fn mode_label(&self) -> &'static str {
        match self.storage {
            Storage::InMemory => "memory",
            Storage::File(_) => "file",
        }
    }

    /// Opens the connection used for writes (or the only connection of a
    /// queue).
    pub(crate) fn open_writer(&self) -> DbResult<Connection> {
        let conn = match &self.storage {
            Storage::InMemory => Connection::open_in_memory()?,
            Storage::File(path) if self.read_only => {
                Connection::open_with_flags(path, read_only_flags())?
            }
            Storage::File(path) => Connection::open(path)?,
        };
        self.bootstrap(&conn, true)?;
        Ok(conn)
    }

    /// Opens an additional read-only connection to a file database.
    pub(crate) fn open_reader(&self) -> DbResult<Connection> {
        let Storage::File(path) = &self.storage else {
            return Err(DbError::InvalidConfiguration(
                "reader connections require file storage".to_string(),
            ));
        };
        let conn = Connection::open_with_flags(path, read_only_flags())?;
        self.bootstrap(&conn, false)?;
        Ok(conn)
    }

    fn bootstrap(&self, conn: &Connection, is_writer: bool) -> DbResult<()> {
        conn.busy_timeout(self.busy_timeout)?;
        let foreign_keys = if self.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;

        if is_writer && !self.read_only {
            if let Some(mode) = self.journal_mode {
                // journal_mode returns a row, so it cannot go through execute_batch.
                let _: String = conn.query_row(
                    &format!("PRAGMA journal_mode = {};", mode.as_sql()),
                    [],
                    |row| row.get(0),
                )?;
            }
        }

        for (name, value) in &self.pragmas {
            conn.pragma_update(None, name.as_str(), value.as_str())?;
        }
        Ok(())
    }
}

fn read_only_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
}

#[cfg(test)]
mod tests {
    use super::{Configuration, JournalMode, Storage};
    use std::time::Duration;

    #[test]
    fn default_configuration_is_in_memory() {
        let config = Configuration::default();
        assert_eq!(config.storage, Storage::InMemory);
        assert!(config.is_in_memory());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.foreign_keys);
        assert!(!config.read_only);
    }

    #[test]
    fn pragmas_are_applied_to_opened_connections() {
        let config = Configuration::in_memory().with_pragma("cache_size", "-4000");
        let conn = config.open_writer().unwrap();
        let cache_size: i64 = conn
            .query_row("PRAGMA cache_size;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(cache_size, -4000);
    }

    #[test]
    fn file_configuration_sets_journal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            Configuration::file(dir.path().join("journal.db")).with_journal_mode(JournalMode::Wal);
        let conn = config.open_writer().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn reader_connection_requires_file_storage() {
        assert!(Configuration::in_memory().open_reader().is_err());
    }
}
