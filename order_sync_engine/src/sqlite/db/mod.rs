//! # SQLite Database methods
//!
//! "Low-level" SQLite interactions for the sync engine.
//!
//! All of these are plain functions taking a `&mut SqliteConnection` rather than methods on a
//! stateful struct. Callers can hand in a pooled connection, or open a transaction and pass
//! `&mut *tx` to compose several calls atomically.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod accounts;
pub mod exchange_rates;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/mos_store.db";

pub fn db_url() -> String {
    let result = env::var("MOS_DATABASE_URL").unwrap_or_else(|_| {
        info!("MOS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
