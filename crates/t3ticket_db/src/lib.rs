//! Relational source of truth for T3 Ticket.
//!
//! Ticket requests and change requests are committed here first. The
//! spreadsheet only ever receives a copy, so nothing in this crate knows
//! about sheets.
//!
//! # Usage
//!
//! ```rust,ignore
//! use t3ticket_db::TicketDb;
//!
//! let db = TicketDb::open("~/.t3ticket/t3ticket.sqlite3").await?;
//! let ticket = db.create_ticket(new_ticket).await?;
//! let change = db.add_change(&ticket.tracking_code, "date moved").await?;
//! ```

mod changes;
mod error;
mod schema;
mod source;
mod tickets;

pub use error::{DbError, Result};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Handle to the ticket database. Cheap to clone.
#[derive(Clone)]
pub struct TicketDb {
    pool: SqlitePool,
}

impl TicketDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Private in-memory database (tests, dry runs).
    ///
    /// A single connection that never idles out, since every SQLite
    /// memory connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Underlying pool, for queries not covered by typed methods.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl TicketDb {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert stored milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("t3ticket.sqlite3");

        let db = TicketDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());
        db.close().await;

        // Reopening an existing file keeps the schema idempotent.
        let db = TicketDb::open(&db_path).await.unwrap();
        db.close().await;
    }

    #[test]
    fn test_millis_round_trip() {
        let now = TicketDb::now_millis();
        assert_eq!(TicketDb::millis_to_datetime(now).timestamp_millis(), now);
    }
}
