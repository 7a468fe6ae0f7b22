use async_trait::async_trait;

use t3ticket_protocol::{ChangeRecord, RecordSource, TicketRecord};

use crate::TicketDb;

#[async_trait]
impl RecordSource for TicketDb {
    async fn tickets_in_creation_order(&self) -> anyhow::Result<Vec<TicketRecord>> {
        Ok(self.list_tickets().await?)
    }

    async fn changes_in_creation_order(&self) -> anyhow::Result<Vec<ChangeRecord>> {
        Ok(self.list_changes().await?)
    }
}
