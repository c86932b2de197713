//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Keep an ordered list of uniquely named schema steps.
//! - Apply pending steps atomically, one transaction per step.
//! - Optionally rebuild the schema from scratch when it drifted (debug only).
//!
//! # Invariants
//! - Step names are unique within one `Migrator`.
//! - A step name is written to `schema_migrations` in the same transaction
//!   as the step itself, so a step is either fully applied and recorded or
//!   neither.
//! - Steps run in registration order and never run twice on one database.

mod schema;

use crate::db::{DatabaseWriter, DbError, DbResult};
use log::{info, warn};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::fmt::{Debug, Formatter};

/// Table holding applied migration names.
pub const HISTORY_TABLE: &str = "schema_migrations";

/// Name of the first application migration.
pub const PLAYER_V1: &str = "v1";

type MigrationStep = Box<dyn Fn(&Transaction<'_>) -> DbResult<()> + Send + Sync>;

struct Migration {
    name: String,
    step: MigrationStep,
}

/// Ordered, named schema migrations for one database.
///
/// Built once with the `register_*` methods and then run with
/// [`Migrator::migrate`]:
///
/// ```no_run
/// use players_core::db::migrations::Migrator;
/// use players_core::db::DatabaseQueue;
///
/// let migrator = Migrator::new()
///     .register_sql_migration("v1", "CREATE TABLE t (id INTEGER PRIMARY KEY);");
/// let queue = DatabaseQueue::new()?;
/// migrator.migrate(&queue)?;
/// # Ok::<(), players_core::db::DbError>(())
/// ```
#[derive(Default)]
pub struct Migrator {
    migrations: Vec<Migration>,
    erase_database_on_schema_change: bool,
}

impl Debug for Migrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("migrations", &self.migration_names())
            .field(
                "erase_database_on_schema_change",
                &self.erase_database_on_schema_change,
            )
            .finish()
    }
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named step.
    ///
    /// # Panics
    /// Panics when `name` is already registered. Duplicate names are a
    /// programming error in the migration list, not a runtime condition.
    pub fn register_migration<F>(self, name: impl Into<String>, step: F) -> Self
    where
        F: Fn(&Transaction<'_>) -> DbResult<()> + Send + Sync + 'static,
    {
        match self.try_register_migration(name, step) {
            Ok(migrator) => migrator,
            Err(err) => panic!("{err}"),
        }
    }

    /// Appends a named step, returning `DuplicateMigration` instead of
    /// panicking on a name clash.
    pub fn try_register_migration<F>(mut self, name: impl Into<String>, step: F) -> DbResult<Self>
    where
        F: Fn(&Transaction<'_>) -> DbResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(DbError::DuplicateMigration(name));
        }
        self.migrations.push(Migration {
            name,
            step: Box::new(step),
        });
        Ok(self)
    }

    /// Appends a step that executes one SQL batch.
    pub fn register_sql_migration(self, name: impl Into<String>, sql: &'static str) -> Self {
        self.register_migration(name, move |tx| {
            tx.execute_batch(sql)?;
            Ok(())
        })
    }

    /// Requests a full schema rebuild when the database schema no longer
    /// matches what the registered steps produce.
    ///
    /// Destroys all data when triggered. Only honored in debug builds and
    /// never for read-only handles.
    pub fn erase_database_on_schema_change(mut self, enabled: bool) -> Self {
        self.erase_database_on_schema_change = enabled;
        self
    }

    /// Registered step names in order.
    pub fn migration_names(&self) -> Vec<&str> {
        self.migrations
            .iter()
            .map(|migration| migration.name.as_str())
            .collect()
    }

    /// Applies every pending step to the database behind `writer`.
    ///
    /// Safe to call repeatedly: steps already recorded in history are
    /// skipped.
    ///
    /// # Errors
    /// - `UnknownAppliedMigrations` when history holds names this migrator
    ///   does not know (database written by a newer build).
    /// - `Migration` when a step fails; earlier steps stay applied.
    pub fn migrate<W: DatabaseWriter>(&self, writer: &W) -> DbResult<()> {
        let config = writer.configuration();
        let erase_allowed = self.erase_allowed(config.read_only);
        let foreign_keys = config.foreign_keys;

        writer.write_without_transaction(|conn| -> DbResult<()> {
            if erase_allowed && self.schema_changed(conn)? {
                warn!(
                    "event=schema_erase module=db status=start reason=schema_changed migrations={}",
                    self.migrations.len()
                );
                schema::erase(conn, foreign_keys)?;
            }
            self.apply_pending(conn)
        })
    }

    /// Names of applied migrations, in the order they were applied.
    ///
    /// Returns an empty list for a database that was never migrated.
    pub fn applied_migrations(&self, conn: &Connection) -> DbResult<Vec<String>> {
        applied_names(conn)
    }

    /// Whether every registered step is recorded as applied.
    pub fn has_completed_migrations(&self, conn: &Connection) -> DbResult<bool> {
        let applied = applied_names(conn)?;
        Ok(self
            .migrations
            .iter()
            .all(|migration| applied.contains(&migration.name)))
    }

    fn contains(&self, name: &str) -> bool {
        self.migrations
            .iter()
            .any(|migration| migration.name == name)
    }

    fn erase_allowed(&self, read_only: bool) -> bool {
        if !self.erase_database_on_schema_change || read_only {
            return false;
        }
        if !cfg!(debug_assertions) {
            warn!("event=schema_erase module=db status=skipped reason=release_build");
            return false;
        }
        true
    }

    fn apply_pending(&self, conn: &mut Connection) -> DbResult<()> {
        ensure_history_table(conn)?;
        let applied = applied_names(conn)?;

        let unknown: Vec<String> = applied
            .iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(DbError::UnknownAppliedMigrations(unknown));
        }

        for migration in &self.migrations {
            if applied.contains(&migration.name) {
                continue;
            }
            apply_one(conn, migration).map_err(|source| DbError::Migration {
                name: migration.name.clone(),
                source: Box::new(source),
            })?;
            info!(
                "event=migration_apply module=db status=ok name={}",
                migration.name
            );
        }
        Ok(())
    }

    /// Compares the live schema with the schema produced by replaying the
    /// already-applied steps on a scratch in-memory database.
    ///
    /// A database without history was never migrated by this engine and is
    /// never reported as changed.
    fn schema_changed(&self, conn: &Connection) -> DbResult<bool> {
        let applied = applied_names(conn)?;
        if applied.is_empty() {
            return Ok(false);
        }
        if applied.iter().any(|name| !self.contains(name)) {
            return Ok(true);
        }

        let mut scratch = Connection::open_in_memory()?;
        ensure_history_table(&scratch)?;
        for migration in &self.migrations {
            if applied.contains(&migration.name) {
                apply_one(&mut scratch, migration)?;
            }
        }

        Ok(schema::snapshot(conn)? != schema::snapshot(&scratch)?)
    }
}

fn apply_one(conn: &mut Connection, migration: &Migration) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    (migration.step)(&tx)?;
    tx.execute(
        "INSERT INTO schema_migrations (name, applied_order)
         VALUES (?1, (SELECT COALESCE(MAX(applied_order), 0) + 1 FROM schema_migrations));",
        params![migration.name],
    )?;
    tx.commit()?;
    Ok(())
}

fn ensure_history_table(conn: &Connection) -> DbResult<()> {
    // Read-only handles must get past this with existing history.
    if schema::table_exists(conn, HISTORY_TABLE)? {
        return Ok(());
    }
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT NOT NULL PRIMARY KEY,
            applied_order INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

fn applied_names(conn: &Connection) -> DbResult<Vec<String>> {
    if !schema::table_exists(conn, HISTORY_TABLE)? {
        return Ok(Vec::new());
    }

    let mut stmt =
        conn.prepare("SELECT name FROM schema_migrations ORDER BY applied_order ASC;")?;
    let mut rows = stmt.query([])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

/// Migrations for the players database, in order.
pub fn player_migrator() -> Migrator {
    Migrator::new().register_sql_migration(PLAYER_V1, include_str!("0001_player.sql"))
}
