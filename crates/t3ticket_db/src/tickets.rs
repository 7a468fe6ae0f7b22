//! Ticket request operations.

use chrono::{NaiveDate, NaiveTime};
use sqlx::Row;
use tracing::{info, warn};

use t3ticket_protocol::{
    NewTicket, StatusChange, TicketRecord, TicketStatus, TrackingCode, TripType,
};

use crate::error::{DbError, Result};
use crate::TicketDb;

const TICKET_COLUMNS: &str = "tracking_code, user_type, transport, reason, reason_other, \
     preferred_airline, full_name, tc_no, phone, email, birth_date, origin, destination, \
     travel_date, departure_time, flight_number, trip_type, return_destination, return_date, \
     return_time, status, pnr_code, notes, purchased_by, rejected_by, rejection_reason, \
     created_at, updated_at";

/// Fresh codes to try before giving up on a unique tracking code.
const CODE_ATTEMPTS: u32 = 5;

impl TicketDb {
    /// Store a new pending ticket under a freshly generated tracking code.
    pub async fn create_ticket(&self, new: NewTicket) -> Result<TicketRecord> {
        let now = Self::millis_to_datetime(Self::now_millis());

        for attempt in 1..=CODE_ATTEMPTS {
            let ticket = TicketRecord::from_new(TrackingCode::generate(), new.clone(), now);
            match self.insert_ticket(&ticket).await {
                Ok(()) => {
                    info!(tracking_code = %ticket.tracking_code, "Ticket created");
                    return Ok(ticket);
                }
                Err(err) if err.is_unique_violation() => {
                    warn!(attempt, tracking_code = %ticket.tracking_code, "Tracking code collision");
                }
                Err(err) => return Err(err),
            }
        }

        Err(DbError::constraint(
            "could not allocate a unique tracking code",
        ))
    }

    /// Insert a fully formed ticket as-is.
    pub async fn insert_ticket(&self, ticket: &TicketRecord) -> Result<()> {
        let sql = format!(
            "INSERT INTO tickets ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TICKET_COLUMNS
        );
        sqlx::query(&sql)
            .bind(ticket.tracking_code.as_str())
            .bind(&ticket.user_type)
            .bind(&ticket.transport)
            .bind(&ticket.reason)
            .bind(&ticket.reason_other)
            .bind(&ticket.preferred_airline)
            .bind(&ticket.full_name)
            .bind(&ticket.tc_no)
            .bind(&ticket.phone)
            .bind(&ticket.email)
            .bind(ticket.birth_date)
            .bind(&ticket.origin)
            .bind(&ticket.destination)
            .bind(ticket.travel_date)
            .bind(ticket.departure_time)
            .bind(&ticket.flight_number)
            .bind(ticket.trip_type.as_str())
            .bind(&ticket.return_destination)
            .bind(ticket.return_date)
            .bind(ticket.return_time)
            .bind(ticket.status.as_str())
            .bind(&ticket.pnr_code)
            .bind(&ticket.notes)
            .bind(&ticket.purchased_by)
            .bind(&ticket.rejected_by)
            .bind(&ticket.rejection_reason)
            .bind(ticket.created_at.timestamp_millis())
            .bind(ticket.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get a ticket by tracking code.
    pub async fn get_ticket(&self, code: &TrackingCode) -> Result<Option<TicketRecord>> {
        let sql = format!("SELECT {} FROM tickets WHERE tracking_code = ?", TICKET_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_ticket(&row)?)),
            None => Ok(None),
        }
    }

    /// Like [`get_ticket`](Self::get_ticket) but a missing ticket is an error.
    pub async fn require_ticket(&self, code: &TrackingCode) -> Result<TicketRecord> {
        self.get_ticket(code)
            .await?
            .ok_or_else(|| DbError::not_found(format!("ticket {}", code)))
    }

    /// Apply a status transition and persist the status-owned fields.
    pub async fn apply_status(
        &self,
        code: &TrackingCode,
        change: StatusChange,
    ) -> Result<TicketRecord> {
        let mut ticket = self.require_ticket(code).await?;
        let from = ticket.status;
        ticket.apply(change)?;
        ticket.updated_at = Self::millis_to_datetime(Self::now_millis());

        sqlx::query(
            r#"
            UPDATE tickets SET
                status = ?,
                pnr_code = ?,
                purchased_by = ?,
                rejected_by = ?,
                rejection_reason = ?,
                updated_at = ?
            WHERE tracking_code = ?
            "#,
        )
        .bind(ticket.status.as_str())
        .bind(&ticket.pnr_code)
        .bind(&ticket.purchased_by)
        .bind(&ticket.rejected_by)
        .bind(&ticket.rejection_reason)
        .bind(ticket.updated_at.timestamp_millis())
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        info!(tracking_code = %code, %from, to = %ticket.status, "Ticket status changed");
        Ok(ticket)
    }

    /// All tickets, oldest first. Ties break on insertion order.
    pub async fn list_tickets(&self) -> Result<Vec<TicketRecord>> {
        let sql = format!("SELECT {} FROM tickets ORDER BY created_at, id", TICKET_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_ticket).collect()
    }

    pub async fn count_tickets(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<TicketRecord> {
    let code: String = row.try_get("tracking_code")?;
    let status: String = row.try_get("status")?;
    let trip_type: String = row.try_get("trip_type")?;

    Ok(TicketRecord {
        tracking_code: TrackingCode::parse(&code)?,
        user_type: row.try_get("user_type")?,
        transport: row.try_get("transport")?,
        reason: row.try_get("reason")?,
        reason_other: row.try_get("reason_other")?,
        preferred_airline: row.try_get("preferred_airline")?,
        full_name: row.try_get("full_name")?,
        tc_no: row.try_get("tc_no")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        birth_date: row.try_get::<Option<NaiveDate>, _>("birth_date")?,
        origin: row.try_get("origin")?,
        destination: row.try_get("destination")?,
        travel_date: row.try_get::<NaiveDate, _>("travel_date")?,
        departure_time: row.try_get::<Option<NaiveTime>, _>("departure_time")?,
        flight_number: row.try_get("flight_number")?,
        trip_type: TripType::parse(&trip_type)?,
        return_destination: row.try_get("return_destination")?,
        return_date: row.try_get::<Option<NaiveDate>, _>("return_date")?,
        return_time: row.try_get::<Option<NaiveTime>, _>("return_time")?,
        status: TicketStatus::parse(&status)?,
        pnr_code: row.try_get("pnr_code")?,
        notes: row.try_get("notes")?,
        purchased_by: row.try_get("purchased_by")?,
        rejected_by: row.try_get("rejected_by")?,
        rejection_reason: row.try_get("rejection_reason")?,
        created_at: TicketDb::millis_to_datetime(row.try_get("created_at")?),
        updated_at: TicketDb::millis_to_datetime(row.try_get("updated_at")?),
    })
}
