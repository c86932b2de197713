//! Reader/writer access contracts for SQLite handles.
//!
//! # Responsibility
//! - Define the only two ways core code touches a database: snapshot reads
//!   and serialized transactional writes.
//!
//! # Invariants
//! - `read` closures observe one consistent snapshot and cannot write.
//! - `write` closures run inside one IMMEDIATE transaction that commits on
//!   `Ok` and rolls back on `Err`.
//! - At most one writer runs at a time per handle.

use super::{Configuration, DbError};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Read-only access to a database handle.
pub trait DatabaseReader: Send + Sync {
    /// Runs `f` against a read-only snapshot of the database.
    ///
    /// Any error type that can absorb a `DbError` may be returned, so
    /// repository closures keep their own error type.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>;
}

/// Serialized write access, on top of read access.
pub trait DatabaseWriter: DatabaseReader {
    /// Runs `f` inside a write transaction.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>;

    /// Runs `f` with exclusive access to the writer connection and no
    /// enclosing transaction. Used by the migrator, which manages its own
    /// per-step transactions.
    fn write_without_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>;

    /// Configuration the handle was opened with.
    fn configuration(&self) -> &Configuration;
}

/// Runs `f` in a deferred transaction with `query_only` enabled.
///
/// The transaction is always rolled back; reads never leave state behind.
pub(crate) fn run_snapshot_read<T, E, F>(conn: &mut Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<DbError>,
{
    conn.execute_batch("PRAGMA query_only = ON;")
        .map_err(|err| E::from(DbError::from(err)))?;

    let result = conn
        .transaction_with_behavior(TransactionBehavior::Deferred)
        .map_err(|err| E::from(DbError::from(err)))
        .and_then(|tx| {
            let snapshot: &Connection = &tx;
            let value = f(snapshot)?;
            tx.rollback().map_err(|err| E::from(DbError::from(err)))?;
            Ok(value)
        });

    conn.execute_batch("PRAGMA query_only = OFF;")
        .map_err(|err| E::from(DbError::from(err)))?;
    result
}

/// Runs `f` in an IMMEDIATE transaction and commits on success.
pub(crate) fn run_write<T, E, F>(conn: &mut Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<DbError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| E::from(DbError::from(err)))?;
    // Dropping `tx` on the error path rolls it back.
    let value = f(&tx)?;
    tx.commit().map_err(|err| E::from(DbError::from(err)))?;
    Ok(value)
}
