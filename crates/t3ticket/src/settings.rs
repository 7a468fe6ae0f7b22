//! Resolved runtime settings and the store handles built from them.

use std::path::PathBuf;
use std::sync::Arc;

use t3ticket_sheets::{
    GoogleSheetsClient, MemorySheets, SheetSync, SheetsApi, SheetsConfig, SheetsResult,
    SyncTarget,
};
use t3ticket_protocol::{CHANGE_HEADERS, TICKET_HEADERS};

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub sheets: SheetsConfig,
    /// Use an in-memory sheet instead of Google Sheets.
    pub dry_run: bool,
}

impl Settings {
    /// Whether per-record writes should be mirrored at all.
    pub fn mirroring_enabled(&self) -> bool {
        self.dry_run || self.sheets.spreadsheet_id().is_ok()
    }

    pub fn tickets_target(&self) -> SyncTarget {
        SyncTarget::tickets(&self.sheets.tickets_worksheet)
    }

    pub fn changes_target(&self) -> SyncTarget {
        SyncTarget::changes(&self.sheets.changes_worksheet)
    }

    /// Build the sync engine over the configured store.
    ///
    /// Credentials are not touched here; a missing key only surfaces on the
    /// first remote call.
    pub fn connect(&self) -> SheetsResult<Connection> {
        let mut memory = None;
        let api: Arc<dyn SheetsApi> = if self.dry_run {
            let store = Arc::new(self.seeded_memory());
            memory = Some(store.clone());
            store
        } else {
            Arc::new(GoogleSheetsClient::new(self.sheets.clone())?)
        };
        let sync = SheetSync::new(api, self.tickets_target(), self.changes_target());
        Ok(Connection {
            sync: Arc::new(sync),
            memory,
        })
    }

    fn seeded_memory(&self) -> MemorySheets {
        MemorySheets::new()
            .with_sheet(&self.sheets.tickets_worksheet, [TICKET_HEADERS.to_vec()])
            .with_sheet(&self.sheets.changes_worksheet, [CHANGE_HEADERS.to_vec()])
    }
}

/// Sync engine plus, in dry-run mode, the in-memory store behind it.
pub struct Connection {
    pub sync: Arc<SheetSync>,
    pub memory: Option<Arc<MemorySheets>>,
}
