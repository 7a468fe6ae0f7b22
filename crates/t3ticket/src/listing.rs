//! Read-side ticket listing with filters and free-text search.

use t3ticket_db::{Result, TicketDb};
use t3ticket_protocol::{TicketRecord, TicketStatus};

/// Which tickets a listing keeps. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub transport: Option<String>,
    pub user_type: Option<String>,
    /// Case-insensitive substring of the name, tracking code or PNR.
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &TicketRecord) -> bool {
        if self.status.is_some_and(|status| status != ticket.status) {
            return false;
        }
        if !field_matches(self.transport.as_deref(), &ticket.transport) {
            return false;
        }
        if !field_matches(self.user_type.as_deref(), &ticket.user_type) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [
                    ticket.full_name.as_str(),
                    ticket.tracking_code.as_str(),
                    ticket.pnr_code.as_deref().unwrap_or(""),
                ]
                .iter()
                .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// Keep matching tickets, most recently updated first.
    pub fn apply(&self, tickets: Vec<TicketRecord>) -> Vec<TicketRecord> {
        let mut kept: Vec<TicketRecord> = tickets.into_iter().filter(|t| self.matches(t)).collect();
        kept.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        kept
    }
}

fn field_matches(wanted: Option<&str>, actual: &str) -> bool {
    match wanted.map(str::trim) {
        Some(wanted) if !wanted.is_empty() => wanted.eq_ignore_ascii_case(actual.trim()),
        _ => true,
    }
}

/// Tickets from the database that pass `filter`.
pub async fn list_tickets(db: &TicketDb, filter: &TicketFilter) -> Result<Vec<TicketRecord>> {
    Ok(filter.apply(db.list_tickets().await?))
}
