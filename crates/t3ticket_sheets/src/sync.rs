//! Sheet sync engine: keyed upsert, append-only change log, row lookup,
//! field patch and full-table resync.
//!
//! Every per-record path re-reads the live header row before writing, so
//! cell order always follows whatever layout the sheet has right now.
//! Resync is the exception: it writes the canonical header itself and never
//! reads.

use std::sync::Arc;
use tracing::{debug, info};

use t3ticket_protocol::{
    ChangeRecord, Record, RecordSource, TicketRecord, ToRecord, CHANGE_HEADERS, CHANGE_KEY_FIELD,
    TICKET_HEADERS, TICKET_KEY_FIELD,
};

use crate::a1::A1Range;
use crate::api::{SheetsApi, ValueInput, ValueRange};
use crate::backoff::{BackoffExecutor, RetryPolicy};
use crate::codec::{decode, encode};
use crate::columns::{normalize_headers, resolve, ColumnIndex};
use crate::error::{SheetsError, SheetsResult};

/// How records reach a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// At most one row per key value.
    Upsert,
    /// Immutable log, one row per event.
    Append,
}

/// A logical table mirrored into one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub worksheet: String,
    /// Column used for lookup (upsert) or required to exist (append).
    pub key_field: String,
    pub mode: WriteMode,
    /// Header written by resync.
    pub canonical_headers: &'static [&'static str],
}

impl SyncTarget {
    pub fn tickets(worksheet: impl Into<String>) -> Self {
        Self {
            worksheet: worksheet.into(),
            key_field: TICKET_KEY_FIELD.to_string(),
            mode: WriteMode::Upsert,
            canonical_headers: TICKET_HEADERS,
        }
    }

    pub fn changes(worksheet: impl Into<String>) -> Self {
        Self {
            worksheet: worksheet.into(),
            key_field: CHANGE_KEY_FIELD.to_string(),
            mode: WriteMode::Append,
            canonical_headers: CHANGE_HEADERS,
        }
    }

    fn canonical_header_row(&self) -> Vec<String> {
        self.canonical_headers.iter().map(|h| h.to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

impl UpsertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertAction::Created => "created",
            UpsertAction::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    /// 1-based sheet row holding the record.
    pub row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Row the store reported writing, when it did.
    pub row: Option<u32>,
}

/// A row read back from a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundRow {
    pub row: u32,
    pub fields: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub row: u32,
    pub written: Vec<String>,
    /// Requested fields the live header does not carry, plus the key field.
    pub skipped: Vec<String>,
}

/// Rows written per target by a full resync (header row excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub tickets_rows: usize,
    pub changes_rows: usize,
}

/// Live layout of a target plus the result of scanning its key column.
struct Located {
    headers: Vec<String>,
    index: ColumnIndex,
    key_rows: usize,
    row: Option<u32>,
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// First sheet row (2-based data rows) whose key cell matches `key`.
fn scan_key_column(column: &[Vec<String>], key: &str) -> Option<u32> {
    let wanted = normalize_key(key);
    column
        .iter()
        .position(|cells| {
            cells
                .first()
                .is_some_and(|cell| normalize_key(cell) == wanted)
        })
        .map(|idx| idx as u32 + 2)
}

/// The sync engine. Owns an explicitly constructed store handle.
pub struct SheetSync {
    api: Arc<dyn SheetsApi>,
    tickets: SyncTarget,
    changes: SyncTarget,
    record_retry: BackoffExecutor,
    bulk_retry: BackoffExecutor,
}

impl SheetSync {
    /// Per-record calls use the exponential policy; resync uses the quota
    /// policy.
    pub fn new(api: Arc<dyn SheetsApi>, tickets: SyncTarget, changes: SyncTarget) -> Self {
        Self {
            api,
            tickets,
            changes,
            record_retry: BackoffExecutor::new(RetryPolicy::exponential()),
            bulk_retry: BackoffExecutor::new(RetryPolicy::quota()),
        }
    }

    pub fn with_retry(mut self, record: RetryPolicy, bulk: RetryPolicy) -> Self {
        self.record_retry = BackoffExecutor::new(record);
        self.bulk_retry = BackoffExecutor::new(bulk);
        self
    }

    pub fn tickets(&self) -> &SyncTarget {
        &self.tickets
    }

    pub fn changes(&self) -> &SyncTarget {
        &self.changes
    }

    /// Live header row of `target`, trimmed. Empty when the sheet is blank.
    pub async fn read_headers(&self, target: &SyncTarget) -> SheetsResult<Vec<String>> {
        let range = A1Range::header_row(&target.worksheet);
        let rows = self
            .record_retry
            .execute("read_headers", || self.api.get_values(&range))
            .await?;
        let raw = rows.into_iter().next().unwrap_or_default();
        Ok(normalize_headers(&raw))
    }

    async fn read_index(&self, target: &SyncTarget) -> SheetsResult<(Vec<String>, ColumnIndex)> {
        let headers = self.read_headers(target).await?;
        if headers.iter().all(|h| h.is_empty()) {
            return Err(SheetsError::configuration(format!(
                "worksheet '{}' has no header row; run a full resync to write one",
                target.worksheet
            )));
        }
        let index = resolve(&headers, &target.key_field)?;
        Ok((headers, index))
    }

    async fn locate(&self, target: &SyncTarget, key: &str) -> SheetsResult<Located> {
        let (headers, index) = self.read_index(target).await?;
        let range = A1Range::column_from(&target.worksheet, index.key_column(), 2);
        let column = self
            .record_retry
            .execute("read_key_column", || self.api.get_values(&range))
            .await?;
        let row = scan_key_column(&column, key);
        debug!(
            sheet = %target.worksheet,
            key,
            scanned = column.len(),
            row = ?row,
            "Scanned key column"
        );
        Ok(Located {
            headers,
            index,
            key_rows: column.len(),
            row,
        })
    }

    fn key_value(target: &SyncTarget, record: &Record) -> SheetsResult<String> {
        let key = record.cell(&target.key_field).trim().to_string();
        if key.is_empty() {
            return Err(SheetsError::invalid_record(format!(
                "record has no value for key field '{}'",
                target.key_field
            )));
        }
        Ok(key)
    }

    /// Update the row carrying the record's key, or append a new one.
    ///
    /// Makes exactly one write. Two concurrent calls for the same new key
    /// can both append; callers that need strict uniqueness serialize.
    pub async fn upsert(&self, target: &SyncTarget, record: &Record) -> SheetsResult<UpsertOutcome> {
        let key = Self::key_value(target, record)?;
        let located = self.locate(target, &key).await?;
        let row_values = vec![encode(record, &located.headers)];
        let width = located.index.width();

        match located.row {
            Some(row) => {
                let range = A1Range::row_span(&target.worksheet, row, width);
                self.record_retry
                    .execute("update_row", || {
                        self.api
                            .update_values(&range, &row_values, ValueInput::UserEntered)
                    })
                    .await?;
                info!(sheet = %target.worksheet, key = %key, row, "Updated sheet row");
                Ok(UpsertOutcome {
                    action: UpsertAction::Updated,
                    row,
                })
            }
            None => {
                let range = A1Range::columns(&target.worksheet, 1, width);
                let receipt = self
                    .record_retry
                    .execute("append_row", || {
                        self.api
                            .append_rows(&range, &row_values, ValueInput::UserEntered)
                    })
                    .await?;
                let row = receipt
                    .first_row()
                    .unwrap_or(located.key_rows as u32 + 2);
                info!(sheet = %target.worksheet, key = %key, row, "Appended sheet row");
                Ok(UpsertOutcome {
                    action: UpsertAction::Created,
                    row,
                })
            }
        }
    }

    pub async fn upsert_ticket(&self, ticket: &TicketRecord) -> SheetsResult<UpsertOutcome> {
        self.upsert(&self.tickets, &ticket.to_record()).await
    }

    /// Append one immutable row. Reads the header row only.
    pub async fn append(&self, target: &SyncTarget, record: &Record) -> SheetsResult<AppendOutcome> {
        let (headers, index) = self.read_index(target).await?;
        let rows = vec![encode(record, &headers)];
        let range = A1Range::columns(&target.worksheet, 1, index.width());
        let receipt = self
            .record_retry
            .execute("append_log_row", || {
                self.api.append_rows(&range, &rows, ValueInput::UserEntered)
            })
            .await?;
        let row = receipt.first_row();
        info!(sheet = %target.worksheet, row = ?row, "Appended log row");
        Ok(AppendOutcome { row })
    }

    pub async fn append_change(&self, change: &ChangeRecord) -> SheetsResult<AppendOutcome> {
        self.append(&self.changes, &change.to_record()).await
    }

    /// Read back the row carrying `key`, decoded against the live header.
    pub async fn find_row(&self, target: &SyncTarget, key: &str) -> SheetsResult<Option<FoundRow>> {
        let located = self.locate(target, key).await?;
        let row = match located.row {
            Some(row) => row,
            None => return Ok(None),
        };
        let range = A1Range::row_span(&target.worksheet, row, located.index.width());
        let values = self
            .record_retry
            .execute("read_row", || self.api.get_values(&range))
            .await?;
        let raw = values.into_iter().next().unwrap_or_default();
        Ok(Some(FoundRow {
            row,
            fields: decode(&raw, &located.headers),
        }))
    }

    pub async fn find_ticket(&self, key: &str) -> SheetsResult<Option<FoundRow>> {
        self.find_row(&self.tickets, key).await
    }

    /// Overwrite individual cells of the row carrying `key`.
    ///
    /// One `batch_update` with a range per field. The key cell is never
    /// rewritten.
    pub async fn update_fields(
        &self,
        target: &SyncTarget,
        key: &str,
        fields: &Record,
    ) -> SheetsResult<PatchOutcome> {
        let located = self.locate(target, key).await?;
        let row = located.row.ok_or_else(|| SheetsError::NotFound {
            sheet: target.worksheet.clone(),
            key: key.to_string(),
        })?;

        let mut data = Vec::new();
        let mut written = Vec::new();
        let mut skipped = Vec::new();
        for (field, value) in fields.iter() {
            match located.index.position(field) {
                Some(column) if field != target.key_field => {
                    data.push(ValueRange {
                        range: A1Range::cell(&target.worksheet, column, row),
                        values: vec![vec![value.to_cell_string()]],
                    });
                    written.push(field.to_string());
                }
                _ => skipped.push(field.to_string()),
            }
        }

        if !data.is_empty() {
            self.record_retry
                .execute("patch_fields", || {
                    self.api.batch_update(&data, ValueInput::UserEntered)
                })
                .await?;
        }
        info!(
            sheet = %target.worksheet,
            key,
            row,
            written = written.len(),
            skipped = skipped.len(),
            "Patched sheet row"
        );
        Ok(PatchOutcome {
            row,
            written,
            skipped,
        })
    }

    pub async fn update_ticket_fields(&self, key: &str, fields: &Record) -> SheetsResult<PatchOutcome> {
        self.update_fields(&self.tickets, key, fields).await
    }

    /// Rewrite both worksheets from `source` without reading them.
    ///
    /// Each target gets one write at `A1`: canonical header followed by
    /// every record in creation order. Rows below the new table that were
    /// left over from a longer previous table are not cleared.
    pub async fn resync(&self, source: &dyn RecordSource) -> SheetsResult<ResyncReport> {
        let tickets = source
            .tickets_in_creation_order()
            .await
            .map_err(|source| SheetsError::Source {
                what: "tickets".to_string(),
                source,
            })?;
        let changes = source
            .changes_in_creation_order()
            .await
            .map_err(|source| SheetsError::Source {
                what: "change requests".to_string(),
                source,
            })?;

        let tickets_rows = self
            .write_table(&self.tickets, tickets.iter().map(ToRecord::to_record))
            .await?;
        let changes_rows = self
            .write_table(&self.changes, changes.iter().map(ToRecord::to_record))
            .await?;

        Ok(ResyncReport {
            tickets_rows,
            changes_rows,
        })
    }

    async fn write_table<I>(&self, target: &SyncTarget, records: I) -> SheetsResult<usize>
    where
        I: Iterator<Item = Record>,
    {
        let headers = target.canonical_header_row();
        let mut table = vec![headers.clone()];
        table.extend(records.map(|record| encode(&record, &headers)));
        let data_rows = table.len() - 1;

        let range = A1Range::cell(&target.worksheet, 1, 1);
        self.bulk_retry
            .execute("resync", || {
                self.api.update_values(&range, &table, ValueInput::Raw)
            })
            .await?;
        info!(sheet = %target.worksheet, rows = data_rows, "Rewrote worksheet");
        Ok(data_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[&str]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Vec::new()
                } else {
                    vec![v.to_string()]
                }
            })
            .collect()
    }

    #[test]
    fn test_scan_is_case_insensitive_and_trimmed() {
        let keys = column(&["AAA111111111", "BBB222222222"]);
        assert_eq!(scan_key_column(&keys, "bbb222222222"), Some(3));
        assert_eq!(scan_key_column(&keys, "  aaa111111111 "), Some(2));
        assert_eq!(scan_key_column(&keys, "CCC333333333"), None);
    }

    #[test]
    fn test_scan_first_duplicate_wins() {
        let keys = column(&["AAA111111111", "", "aaa111111111"]);
        assert_eq!(scan_key_column(&keys, "AAA111111111"), Some(2));
    }

    #[test]
    fn test_targets() {
        let tickets = SyncTarget::tickets("Tickets");
        assert_eq!(tickets.key_field, "tracking_code");
        assert_eq!(tickets.mode, WriteMode::Upsert);
        let changes = SyncTarget::changes("Changes");
        assert_eq!(changes.mode, WriteMode::Append);
        assert_eq!(changes.canonical_header_row().len(), 3);
    }
}
