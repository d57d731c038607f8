//! # SQLite Database methods
//!
//! Low-level queries, written as free functions that accept a `&mut SqliteConnection`. Callers can pass a pooled
//! connection, or `&mut *tx` to run several of them inside one transaction.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod debts;
pub mod orders;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/bolt_store.db";

pub fn db_url() -> String {
    let result = env::var("BOLT_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ BOLT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
