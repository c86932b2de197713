//! Record store facade for the players database.
//!
//! # Responsibility
//! - Own the storage handle and migrate it before anything else can use it.
//! - Route every player write through one writer transaction.
//! - Hand out read access for arbitrary read-only queries.
//!
//! # Invariants
//! - An `AppDatabase` only exists once its handle is fully migrated.
//! - `save_player` changes the caller's `id` only after the write committed.

use crate::db::migrations::{player_migrator, Migrator};
use crate::db::{Configuration, DatabaseReader, DatabaseWriter, DbResult};
use crate::model::player::Player;
use crate::repo::player_repo::{PlayerRepository, RepoResult, SqlitePlayerRepository};
use log::info;

/// Players database: a migrated handle plus the write/read entry points.
///
/// Generic over the handle, so callers pick `DatabaseQueue` (memory or
/// file) or `DatabasePool` (file with concurrent readers).
pub struct AppDatabase<W: DatabaseWriter> {
    writer: W,
}

impl<W: DatabaseWriter> AppDatabase<W> {
    /// Takes ownership of `writer` and applies all pending migrations.
    ///
    /// # Errors
    /// Returns the migration error unchanged; no store is created then.
    pub fn new(writer: W) -> DbResult<Self> {
        Self::migrator().migrate(&writer)?;
        info!(
            "event=store_open module=service status=ok mode={}",
            writer.configuration().mode_label()
        );
        Ok(Self { writer })
    }

    fn migrator() -> Migrator {
        // Schema edits during development rebuild the database instead of
        // requiring a new migration.
        player_migrator().erase_database_on_schema_change(cfg!(debug_assertions))
    }

    /// Saves (inserts or updates) a player.
    ///
    /// When this returns `Ok`, the player is present in the database and
    /// `player.id` is set. On error `player` is left untouched.
    pub fn save_player(&self, player: &mut Player) -> RepoResult<()> {
        let mut draft = player.clone();
        let id = self
            .writer
            .write(|tx| SqlitePlayerRepository::new(tx).save_player(&mut draft))?;
        player.id = Some(id);
        Ok(())
    }

    /// Read-only access to the database.
    pub fn reader(&self) -> &impl DatabaseReader {
        &self.writer
    }

    /// Returns `config` unchanged. Hook for app-wide connection settings.
    pub fn make_configuration(config: Configuration) -> Configuration {
        config
    }
}
