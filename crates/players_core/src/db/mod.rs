//! SQLite storage handles, configuration and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the players core.
//! - Provide single-writer / multi-reader access over those connections.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Applied migrations are tracked by name in `schema_migrations`.
//! - Core code must not read/write application data before migrations succeed.
//! - All row-level writes run inside a writer transaction.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod access;
mod config;
pub mod migrations;
mod pool;
mod queue;

pub use access::{DatabaseReader, DatabaseWriter};
pub use config::{Configuration, JournalMode, Storage};
pub use pool::DatabasePool;
pub use queue::DatabaseQueue;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A registered migration step failed; its transaction was rolled back.
    Migration {
        name: String,
        source: Box<DbError>,
    },
    DuplicateMigration(String),
    /// History names that this binary does not know about.
    UnknownAppliedMigrations(Vec<String>),
    InvalidConfiguration(String),
    LockPoisoned(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration { name, source } => {
                write!(f, "migration `{name}` failed: {source}")
            }
            Self::DuplicateMigration(name) => {
                write!(f, "migration `{name}` is already registered")
            }
            Self::UnknownAppliedMigrations(names) => write!(
                f,
                "database has applied migrations unknown to this build: {}",
                names.join(", ")
            ),
            Self::InvalidConfiguration(message) => {
                write!(f, "invalid database configuration: {message}")
            }
            Self::LockPoisoned(what) => write!(f, "{what} lock poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source.as_ref()),
            Self::DuplicateMigration(_)
            | Self::UnknownAppliedMigrations(_)
            | Self::InvalidConfiguration(_)
            | Self::LockPoisoned(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn migration_error_display_includes_step_name() {
        let err = DbError::Migration {
            name: "v2".to_string(),
            source: Box::new(DbError::InvalidConfiguration("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "migration `v2` failed: invalid database configuration: boom"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn unknown_migrations_are_listed() {
        let err = DbError::UnknownAppliedMigrations(vec!["v7".into(), "v8".into()]);
        assert!(err.to_string().ends_with("v7, v8"));
    }
}
