//! Read access to the authoritative record store.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChangeRecord, TicketRecord};

/// Supplies every live record for a full-table resync.
///
/// Implementations must return records in stable creation order so that
/// repeated resyncs produce identical sheets.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All tickets, oldest first.
    async fn tickets_in_creation_order(&self) -> Result<Vec<TicketRecord>>;

    /// All change requests, oldest first.
    async fn changes_in_creation_order(&self) -> Result<Vec<ChangeRecord>>;
}

/// Fixed in-memory source, handy for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub tickets: Vec<TicketRecord>,
    pub changes: Vec<ChangeRecord>,
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn tickets_in_creation_order(&self) -> Result<Vec<TicketRecord>> {
        let mut tickets = self.tickets.clone();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }

    async fn changes_in_creation_order(&self) -> Result<Vec<ChangeRecord>> {
        let mut changes = self.changes.clone();
        changes.sort_by_key(|c| (c.created_at, c.id));
        Ok(changes)
    }
}
