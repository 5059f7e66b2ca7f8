//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite connection pool and migrations
//! - Credential store (`secret_tokens` table)

mod database;
mod models;

pub use database::Database;
pub use models::*;
