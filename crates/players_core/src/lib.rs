//! Persistence core for the players database.
//! Owns schema migrations, storage handles and the `Player` record store.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::migrations::Migrator;
pub use db::{
    Configuration, DatabasePool, DatabaseQueue, DatabaseReader, DatabaseWriter, DbError,
    DbResult, JournalMode, Storage,
};
pub use logging::{default_log_level, init_logging, logging_status, LogInitError};
pub use model::player::{Player, PlayerId, PlayerValidationError};
pub use repo::player_repo::{PlayerRepository, RepoError, RepoResult, SqlitePlayerRepository};
pub use service::app_database::AppDatabase;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
