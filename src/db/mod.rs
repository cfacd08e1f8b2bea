//! Database layer for mailbox-carbon
//!
//! Handles SQLite persistence of the key-value blobs the analyzer caches
//! between runs (the last [`AnalysisResult`](crate::AnalysisResult)).
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by concern:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`kv`] - Key-value rows (`kv_store` table)

use sqlx::sqlite::SqlitePool;

mod kv;
mod migrations;

/// Database handle for mailbox-carbon
pub struct Database {
    pool: SqlitePool,
}
