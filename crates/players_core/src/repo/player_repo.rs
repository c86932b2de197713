//! Player repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/save and lookup APIs over the `player` table.
//! - Keep SQL details inside core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Player::validate()` before SQL mutations.
//! - Only SQLite assigns player ids; inserts never bind a caller id.
//! - Saving a player that carries an id updates that row and never inserts.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::player::{Player, PlayerId, PlayerValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PLAYER_SELECT_SQL: &str = "SELECT
    id,
    name,
    score
FROM player";

pub type RepoResult<T> = Result<T, RepoError>;

/// Why a player could not be stored or loaded.
#[derive(Debug)]
pub enum RepoError {
    /// The player failed `Player::validate()`.
    Validation(PlayerValidationError),
    Db(DbError),
    /// No `player` row has this id.
    NotFound(PlayerId),
    /// Update requested for a player that was never inserted.
    MissingId,
    /// Insert requested for a player that already has a row id.
    AlreadyPersisted(PlayerId),
    /// A stored row breaks a `Player` invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "player rejected: {err}"),
            Self::Db(err) => write!(f, "player storage failed: {err}"),
            Self::NotFound(id) => write!(f, "no player row with id {id}"),
            Self::MissingId => write!(f, "player has no id yet; insert it first"),
            Self::AlreadyPersisted(id) => {
                write!(f, "player already stored with id {id}; update it instead")
            }
            Self::InvalidData(message) => write!(f, "stored player row is invalid: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::MissingId | Self::AlreadyPersisted(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<PlayerValidationError> for RepoError {
    fn from(value: PlayerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for player persistence.
pub trait PlayerRepository {
    /// Inserts a new row and stores the generated id in `player.id`.
    fn insert_player(&self, player: &mut Player) -> RepoResult<PlayerId>;
    /// Updates the row identified by `player.id`.
    fn update_player(&self, player: &Player) -> RepoResult<()>;
    /// Inserts when `player.id` is unset, updates otherwise.
    fn save_player(&self, player: &mut Player) -> RepoResult<PlayerId>;
    fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>>;
    fn count_players(&self) -> RepoResult<u64>;
}

/// SQLite-backed player repository.
///
/// Borrowing a `Transaction` works as well, since it derefs to `Connection`.
pub struct SqlitePlayerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlayerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PlayerRepository for SqlitePlayerRepository<'_> {
    fn insert_player(&self, player: &mut Player) -> RepoResult<PlayerId> {
        if let Some(id) = player.id {
            return Err(RepoError::AlreadyPersisted(id));
        }
        player.validate()?;

        self.conn.execute(
            "INSERT INTO player (
                name,
                score
            ) VALUES (?1, ?2);",
            params![player.name.as_str(), player.score],
        )?;

        let id = self.conn.last_insert_rowid();
        player.id = Some(id);
        Ok(id)
    }

    fn update_player(&self, player: &Player) -> RepoResult<()> {
        let Some(id) = player.id else {
            return Err(RepoError::MissingId);
        };
        player.validate()?;

        let changed = self.conn.execute(
            "UPDATE player
             SET
                name = ?1,
                score = ?2
             WHERE id = ?3;",
            params![player.name.as_str(), player.score, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn save_player(&self, player: &mut Player) -> RepoResult<PlayerId> {
        match player.id {
            None => self.insert_player(player),
            Some(id) => {
                self.update_player(player)?;
                Ok(id)
            }
        }
    }

    fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PLAYER_SELECT_SQL}
             WHERE id = ?1;"
        ))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_player_row(row)?));
        }

        Ok(None)
    }

    fn count_players(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM player;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative player count `{count}`")))
    }
}

fn parse_player_row(row: &Row<'_>) -> RepoResult<Player> {
    let player = Player::from_row(row)?;
    player.validate().map_err(|_| {
        RepoError::InvalidData(format!(
            "player {} has a blank name",
            player.id.unwrap_or_default()
        ))
    })?;
    Ok(player)
}
