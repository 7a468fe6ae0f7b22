//! Per-command wiring: database, sync engine and mirror queue.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use t3ticket::{Connection, Intake, MirrorQueue, MirrorStats, Settings, StatusMirror};
use t3ticket_db::TicketDb;
use t3ticket_protocol::TrackingCode;
use t3ticket_sheets::MemorySheets;

use super::error::HelpfulError;

/// Run an async command body on a fresh current-thread runtime.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(future)
}

pub async fn open_db(settings: &Settings) -> Result<TicketDb> {
    TicketDb::open(&settings.db_path).await.map_err(|e| {
        HelpfulError::new("Failed to open database")
            .with_context(format!("Database: {}", settings.db_path.display()))
            .with_suggestion(format!("Error: {}", e))
            .with_suggestion("TRY: Check file permissions")
            .into()
    })
}

pub fn parse_code(value: &str) -> Result<TrackingCode> {
    TrackingCode::parse(value).map_err(|_| HelpfulError::invalid_tracking_code(value).into())
}

pub fn connect(settings: &Settings, action: &str) -> Result<Connection> {
    settings
        .connect()
        .map_err(|e| HelpfulError::from_sheets(action, e).into())
}

/// A database write path with mirroring attached.
pub struct Session {
    pub intake: Intake,
    queue: MirrorQueue,
    memory: Option<Arc<MemorySheets>>,
    mirroring: bool,
}

impl Session {
    pub async fn open(settings: &Settings, status_mirror: StatusMirror) -> Result<Self> {
        let db = open_db(settings).await?;
        let (queue, memory) = if settings.mirroring_enabled() {
            let conn = connect(settings, "Mirroring setup")?;
            (MirrorQueue::start(conn.sync), conn.memory)
        } else {
            warn!("No spreadsheet configured; changes will not be mirrored");
            (MirrorQueue::disabled(), None)
        };
        let intake = Intake::new(db, queue.handle()).with_status_mirror(status_mirror);
        Ok(Self {
            intake,
            queue,
            memory,
            mirroring: settings.mirroring_enabled(),
        })
    }

    /// Wait for queued mirror jobs and report how they went.
    pub async fn finish(self) -> MirrorStats {
        let Session {
            intake,
            queue,
            memory,
            mirroring,
        } = self;
        drop(intake);
        let stats = queue.shutdown().await;

        if !mirroring {
            println!("Sheet mirroring is disabled (no spreadsheet configured).");
        } else if stats.failed > 0 {
            eprintln!(
                "Warning: {} mirror write(s) failed; the database is up to date. \
                 Run `t3ticket resync` to bring the sheet back in line.",
                stats.failed
            );
        } else if let Some(memory) = memory {
            println!(
                "Dry run: {} sheet write(s) recorded in memory.",
                memory.write_count()
            );
        }
        stats
    }
}
