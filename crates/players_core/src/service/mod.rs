//! Core use-case services.
//!
//! # Responsibility
//! - Wrap storage handles and repositories into the app-facing record store.
//! - Keep callers decoupled from SQL and transaction details.

pub mod app_database;
