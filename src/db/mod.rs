//! Database layer for xhs-dl
//!
//! Handles SQLite persistence of the download record: which items have already
//! been fetched, so batch tasks can skip them.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`records`] - Downloaded-item records ([`RecordStore`](crate::remote::RecordStore))

use sqlx::sqlite::SqlitePool;

mod migrations;
mod records;

/// Downloaded item record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DownloadRecord {
    /// Platform item id
    pub item_id: String,
    /// Unix timestamp when the item was recorded
    pub recorded_at: i64,
}

/// Database handle for xhs-dl persistence
pub struct Database {
    pool: SqlitePool,
}
