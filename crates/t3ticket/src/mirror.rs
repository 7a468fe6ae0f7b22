//! Background mirroring of committed records into the spreadsheet.
//!
//! The database is the source of truth. Once a write has committed, the
//! intake path hands the record to the [`MirrorQueue`]; a single worker task
//! owns the [`SheetSync`] and applies jobs one at a time, so two upserts for
//! the same key never interleave inside one process. A failed job is logged
//! and counted, never reported back to the writer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use t3ticket_protocol::{ChangeRecord, Record, TicketRecord, TrackingCode};
use t3ticket_sheets::{SheetSync, SheetsResult};

/// Fields owned by the status state machine.
pub const STATUS_FIELDS: &[&str] = &[
    "status",
    "pnr_code",
    "purchased_by",
    "rejected_by",
    "rejection_reason",
    "updated_at",
];

/// One unit of mirroring work.
#[derive(Debug, Clone)]
pub enum MirrorJob {
    /// Upsert the full ticket row.
    Ticket(TicketRecord),
    /// Append one row to the change log.
    Change(ChangeRecord),
    /// Overwrite only the given cells of an existing ticket row.
    Patch { code: TrackingCode, fields: Record },
}

impl MirrorJob {
    /// Status-only patch for a ticket whose row already exists.
    pub fn status_patch(ticket: &TicketRecord) -> Self {
        let fields = Record::new()
            .with("status", ticket.status.as_str())
            .with("pnr_code", ticket.pnr_code.clone())
            .with("purchased_by", ticket.purchased_by.clone())
            .with("rejected_by", ticket.rejected_by.clone())
            .with("rejection_reason", ticket.rejection_reason.clone())
            .with("updated_at", ticket.updated_at);
        MirrorJob::Patch {
            code: ticket.tracking_code.clone(),
            fields,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MirrorJob::Ticket(_) => "ticket",
            MirrorJob::Change(_) => "change",
            MirrorJob::Patch { .. } => "patch",
        }
    }

    fn key(&self) -> &str {
        match self {
            MirrorJob::Ticket(ticket) => ticket.tracking_code.as_str(),
            MirrorJob::Change(change) => change.ticket_tracking_code.as_str(),
            MirrorJob::Patch { code, .. } => code.as_str(),
        }
    }
}

/// Counts reported when the queue drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs dropped because mirroring is disabled or the worker was gone.
    pub dropped: usize,
}

/// Cheap, cloneable sender side of the queue.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    tx: Option<mpsc::UnboundedSender<MirrorJob>>,
}

impl MirrorHandle {
    /// A handle that discards every job. Used when no spreadsheet is
    /// configured.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a job. Never blocks and never fails the caller.
    pub fn enqueue(&self, job: MirrorJob) -> bool {
        let Some(tx) = &self.tx else {
            debug!(kind = job.kind(), "Mirroring disabled, job discarded");
            return false;
        };
        let kind = job.kind();
        match tx.send(job) {
            Ok(()) => true,
            Err(_) => {
                warn!(kind, "Mirror worker has stopped, job discarded");
                false
            }
        }
    }
}

/// Owns the worker task. Drop the last [`MirrorHandle`] clone and call
/// [`shutdown`](Self::shutdown) to drain it.
pub struct MirrorQueue {
    handle: MirrorHandle,
    worker: Option<JoinHandle<MirrorStats>>,
}

impl MirrorQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(sync: Arc<SheetSync>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(sync, rx));
        Self {
            handle: MirrorHandle { tx: Some(tx) },
            worker: Some(worker),
        }
    }

    /// A queue with no worker. Every job is discarded.
    pub fn disabled() -> Self {
        Self {
            handle: MirrorHandle::disabled(),
            worker: None,
        }
    }

    pub fn handle(&self) -> MirrorHandle {
        self.handle.clone()
    }

    pub fn enqueue(&self, job: MirrorJob) -> bool {
        self.handle.enqueue(job)
    }

    /// Close the queue and wait for every queued job to finish.
    ///
    /// Outstanding [`MirrorHandle`] clones keep the channel open; drop them
    /// first or this waits for them.
    pub async fn shutdown(mut self) -> MirrorStats {
        self.handle.tx = None;
        let Some(worker) = self.worker.take() else {
            return MirrorStats::default();
        };
        match worker.await {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "Mirror worker panicked");
                MirrorStats {
                    failed: 1,
                    ..MirrorStats::default()
                }
            }
        }
    }
}

async fn run_worker(
    sync: Arc<SheetSync>,
    mut rx: mpsc::UnboundedReceiver<MirrorJob>,
) -> MirrorStats {
    let mut stats = MirrorStats::default();
    while let Some(job) = rx.recv().await {
        match apply(&sync, &job).await {
            Ok(()) => stats.succeeded += 1,
            Err(err) => {
                stats.failed += 1;
                error!(
                    kind = job.kind(),
                    key = job.key(),
                    transient = err.is_transient(),
                    error = %err,
                    "Mirroring failed"
                );
            }
        }
    }
    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Mirror queue drained"
    );
    stats
}

async fn apply(sync: &SheetSync, job: &MirrorJob) -> SheetsResult<()> {
    match job {
        MirrorJob::Ticket(ticket) => {
            sync.upsert_ticket(ticket).await?;
        }
        MirrorJob::Change(change) => {
            sync.append_change(change).await?;
        }
        MirrorJob::Patch { code, fields } => {
            let outcome = sync.update_ticket_fields(code.as_str(), fields).await?;
            if !outcome.skipped.is_empty() {
                warn!(
                    tracking_code = %code,
                    skipped = ?outcome.skipped,
                    "Sheet is missing patched columns"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use t3ticket_protocol::{NewTicket, StatusChange};

    fn ticket() -> TicketRecord {
        let new = NewTicket {
            full_name: "A".into(),
            travel_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            ..NewTicket::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        TicketRecord::from_new(TrackingCode::parse("AAA111111111").unwrap(), new, now)
    }

    #[test]
    fn test_status_patch_carries_status_fields_only() {
        let mut t = ticket();
        t.apply(StatusChange::Ticket {
            pnr_code: "PNR9".into(),
            purchased_by: None,
        })
        .unwrap();

        let MirrorJob::Patch { code, fields } = MirrorJob::status_patch(&t) else {
            panic!("expected patch");
        };
        assert_eq!(code.as_str(), "AAA111111111");
        let names: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        let mut expected = STATUS_FIELDS.to_vec();
        expected.sort_unstable();
        assert_eq!(names, expected);
        assert_eq!(fields.cell("status"), "ticketed");
        assert_eq!(fields.cell("pnr_code"), "PNR9");
        assert_eq!(fields.cell("purchased_by"), "");
    }

    #[test]
    fn test_disabled_handle_discards() {
        let handle = MirrorHandle::disabled();
        assert!(!handle.is_enabled());
        assert!(!handle.enqueue(MirrorJob::Ticket(ticket())));
    }
}
