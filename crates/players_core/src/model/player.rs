//! Player domain model.
//!
//! # Responsibility
//! - Define the single persisted record of the players database.
//! - Map between `Player` values and `player` table rows explicitly.
//!
//! # Invariants
//! - `id` is `None` if and only if the player was never inserted.
//! - Once assigned, `id` identifies exactly one `player` row.
//! - `name` is never empty or whitespace-only.

use crate::db::DbResult;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Table storing players.
pub const TABLE_NAME: &str = "player";

/// Column names of the `player` table.
pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const SCORE: &str = "score";
}

/// Row identifier assigned by SQLite on insert.
pub type PlayerId = i64;

/// Validation errors raised before a player is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerValidationError {
    EmptyName,
}

impl Display for PlayerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "player name must not be empty"),
        }
    }
}

impl Error for PlayerValidationError {}

/// A player and its score.
///
/// Equality compares all fields, including `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Set by the store on first insert.
    pub id: Option<PlayerId>,
    pub name: String,
    pub score: i64,
}

impl Player {
    /// Creates a player that has not been inserted yet.
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            score,
        }
    }

    pub fn validate(&self) -> Result<(), PlayerValidationError> {
        if self.name.trim().is_empty() {
            return Err(PlayerValidationError::EmptyName);
        }
        Ok(())
    }

    /// Whether this value already has a row in the database.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Builds a player from a row selected with `id, name, score` columns.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(columns::ID)?),
            name: row.get(columns::NAME)?,
            score: row.get(columns::SCORE)?,
        })
    }

    /// Returns the player with the lowest id, or `None` for an empty table.
    ///
    /// Shaped for `reader.read(Player::fetch_one)`.
    pub fn fetch_one(conn: &Connection) -> DbResult<Option<Self>> {
        let player = conn
            .query_row(
                "SELECT id, name, score FROM player ORDER BY id ASC LIMIT 1;",
                [],
                Self::from_row,
            )
            .optional()?;
        Ok(player)
    }

    /// Returns the player stored under `id`, if any.
    pub fn fetch_by_id(conn: &Connection, id: PlayerId) -> DbResult<Option<Self>> {
        let player = conn
            .query_row(
                "SELECT id, name, score FROM player WHERE id = ?1;",
                [id],
                Self::from_row,
            )
            .optional()?;
        Ok(player)
    }

    /// Returns all players ordered by id.
    pub fn fetch_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, name, score FROM player ORDER BY id ASC;")?;
        let players = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    pub fn fetch_count(conn: &Connection) -> DbResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM player;", [], |row| row.get(0))?;
        Ok(count)
    }
}
