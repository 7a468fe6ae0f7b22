//! Table definitions. All CREATE statements live here.

use crate::error::Result;
use crate::TicketDb;
use tracing::debug;

impl TicketDb {
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&self.pool)
            .await?;

        // Dates and times are ISO text; audit timestamps are epoch millis.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_code TEXT NOT NULL UNIQUE,
                user_type TEXT NOT NULL,
                transport TEXT NOT NULL,
                reason TEXT NOT NULL,
                reason_other TEXT,
                preferred_airline TEXT,
                full_name TEXT NOT NULL,
                tc_no TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT NOT NULL,
                birth_date TEXT,
                origin TEXT NOT NULL,
                destination TEXT NOT NULL,
                travel_date TEXT NOT NULL,
                departure_time TEXT,
                flight_number TEXT,
                trip_type TEXT NOT NULL DEFAULT 'oneway',
                return_destination TEXT,
                return_date TEXT,
                return_time TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                pnr_code TEXT,
                notes TEXT,
                purchased_by TEXT,
                rejected_by TEXT,
                rejection_reason TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_created ON tickets(created_at, id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS change_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_tracking_code TEXT NOT NULL REFERENCES tickets(tracking_code),
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_changes_ticket ON change_requests(ticket_tracking_code)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Database schema verified");
        Ok(())
    }
}
