//! Change request operations. Rows are insert-only.

use sqlx::Row;
use tracing::info;

use t3ticket_protocol::{ChangeRecord, TrackingCode, ValidationError};

use crate::error::Result;
use crate::TicketDb;

impl TicketDb {
    /// Record a change request against an existing ticket.
    pub async fn add_change(&self, code: &TrackingCode, reason: &str) -> Result<ChangeRecord> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyChangeReason.into());
        }
        self.require_ticket(code).await?;

        let now = Self::now_millis();
        let result = sqlx::query(
            "INSERT INTO change_requests (ticket_tracking_code, reason, created_at) VALUES (?, ?, ?)",
        )
        .bind(code.as_str())
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let change = ChangeRecord {
            id: result.last_insert_rowid(),
            ticket_tracking_code: code.clone(),
            reason: reason.to_string(),
            created_at: Self::millis_to_datetime(now),
        };
        info!(tracking_code = %code, id = change.id, "Change request recorded");
        Ok(change)
    }

    /// All change requests, oldest first.
    pub async fn list_changes(&self) -> Result<Vec<ChangeRecord>> {
        let rows = sqlx::query(
            "SELECT id, ticket_tracking_code, reason, created_at FROM change_requests ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_change).collect()
    }

    /// Change requests for one ticket, oldest first.
    pub async fn changes_for(&self, code: &TrackingCode) -> Result<Vec<ChangeRecord>> {
        let rows = sqlx::query(
            "SELECT id, ticket_tracking_code, reason, created_at FROM change_requests \
             WHERE ticket_tracking_code = ? ORDER BY created_at, id",
        )
        .bind(code.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_change).collect()
    }
}

fn row_to_change(row: &sqlx::sqlite::SqliteRow) -> Result<ChangeRecord> {
    let code: String = row.try_get("ticket_tracking_code")?;
    Ok(ChangeRecord {
        id: row.try_get("id")?,
        ticket_tracking_code: TrackingCode::parse(&code)?,
        reason: row.try_get("reason")?,
        created_at: TicketDb::millis_to_datetime(row.try_get("created_at")?),
    })
}
