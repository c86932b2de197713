//! Domain model for the players database.
//!
//! # Responsibility
//! - Define the persisted record types and their row mapping.
//!
//! # Invariants
//! - Storage keys are assigned by SQLite, never by callers.

pub mod player;
