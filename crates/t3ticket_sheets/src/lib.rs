//! Header-indexed spreadsheet sync for T3 Ticket.
//!
//! The relational store is the source of truth; this crate mirrors its
//! records into a tabular store addressed by A1 ranges:
//!
//! - [`SheetSync::upsert`]: at most one row per key, full-row overwrite
//! - [`SheetSync::append_change`]: immutable log rows
//! - [`SheetSync::resync`]: blind bulk rewrite, no reads
//!
//! Remote calls go through [`SheetsApi`]; [`GoogleSheetsClient`] talks to
//! Google Sheets, [`MemorySheets`] keeps everything in process.

pub mod a1;
pub mod api;
pub mod backoff;
pub mod codec;
pub mod columns;
pub mod credentials;
pub mod error;
pub mod google;
pub mod memory;
pub mod sync;

pub use a1::{column_label, column_number, A1Error, A1Range, CellRef};
pub use api::{SheetsApi, ValueInput, ValueRange, WriteReceipt};
pub use backoff::{BackoffExecutor, RetryPolicy};
pub use columns::{resolve, ColumnIndex};
pub use credentials::{CredentialSettings, CredentialSource, ServiceAccountKey};
pub use error::{SheetsError, SheetsResult};
pub use google::{GoogleSheetsClient, SheetsConfig};
pub use memory::{InjectedFailure, MemorySheets, SheetCall};
pub use sync::{
    AppendOutcome, FoundRow, PatchOutcome, ResyncReport, SheetSync, SyncTarget, UpsertAction,
    UpsertOutcome, WriteMode,
};
