//! Write path for tickets and change requests.
//!
//! Every operation commits to the database first and only then queues the
//! mirror job. A mirroring failure cannot undo or fail the write.

use t3ticket_db::{Result, TicketDb};
use t3ticket_protocol::{ChangeRecord, NewTicket, StatusChange, TicketRecord, TrackingCode};

use crate::mirror::{MirrorHandle, MirrorJob};

/// How a status change reaches the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusMirror {
    /// Rewrite the whole row. Creates it if missing.
    #[default]
    FullRow,
    /// Overwrite only the status-owned cells of an existing row.
    Patch,
}

#[derive(Clone)]
pub struct Intake {
    db: TicketDb,
    mirror: MirrorHandle,
    status_mirror: StatusMirror,
}

impl Intake {
    pub fn new(db: TicketDb, mirror: MirrorHandle) -> Self {
        Self {
            db,
            mirror,
            status_mirror: StatusMirror::default(),
        }
    }

    pub fn with_status_mirror(mut self, mode: StatusMirror) -> Self {
        self.status_mirror = mode;
        self
    }

    pub fn db(&self) -> &TicketDb {
        &self.db
    }

    /// Store a new pending ticket and mirror it.
    pub async fn submit_ticket(&self, new: NewTicket) -> Result<TicketRecord> {
        let ticket = self.db.create_ticket(new).await?;
        self.mirror.enqueue(MirrorJob::Ticket(ticket.clone()));
        Ok(ticket)
    }

    /// Apply a status transition and mirror the result.
    pub async fn set_status(
        &self,
        code: &TrackingCode,
        change: StatusChange,
    ) -> Result<TicketRecord> {
        let ticket = self.db.apply_status(code, change).await?;
        let job = match self.status_mirror {
            StatusMirror::FullRow => MirrorJob::Ticket(ticket.clone()),
            StatusMirror::Patch => MirrorJob::status_patch(&ticket),
        };
        self.mirror.enqueue(job);
        Ok(ticket)
    }

    /// Record a change request and append it to the change log.
    pub async fn request_change(&self, code: &TrackingCode, reason: &str) -> Result<ChangeRecord> {
        let change = self.db.add_change(code, reason).await?;
        self.mirror.enqueue(MirrorJob::Change(change.clone()));
        Ok(change)
    }
}
