//! In-process [`SheetsApi`] implementation.
//!
//! Behaves like the remote store for the operations the engine uses:
//! ragged reads, append-after-last-row, anchored updates that reject data
//! overflowing a bounded range. With [`MemorySheets::parsing_numbers`],
//! user-entered numeric text is stored as a number the way the remote
//! store does, and read back unformatted. Every call is recorded so tests can assert
//! on read/write counts, and failures can be queued up front.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::a1::{A1Range, CellRef};
use crate::api::{SheetsApi, ValueInput, ValueRange, WriteReceipt};
use crate::error::{SheetsError, SheetsResult};

/// A recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetCall {
    Get { range: String },
    Append { range: String, rows: usize },
    Update { range: String, rows: usize },
    BatchUpdate { ranges: Vec<String> },
}

impl SheetCall {
    pub fn is_read(&self) -> bool {
        matches!(self, SheetCall::Get { .. })
    }

    pub fn is_write(&self) -> bool {
        !self.is_read()
    }
}

/// Failure to hand out on an upcoming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// HTTP 429 quota response.
    Quota,
    /// HTTP 400 bad request.
    BadRequest,
}

impl InjectedFailure {
    fn to_error(self) -> SheetsError {
        match self {
            InjectedFailure::Quota => SheetsError::transient(
                Some(429),
                "Quota exceeded for quota metric 'Write requests' (injected)",
            ),
            InjectedFailure::BadRequest => {
                SheetsError::permanent(Some(400), "Unable to parse range (injected)")
            }
        }
    }
}

type Grid = Vec<Vec<String>>;

#[derive(Debug, Default)]
struct MemoryState {
    sheets: BTreeMap<String, Grid>,
    calls: Vec<SheetCall>,
    failures: VecDeque<InjectedFailure>,
    parse_numbers: bool,
}

#[derive(Debug, Default)]
pub struct MemorySheets {
    state: Mutex<MemoryState>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worksheet with the given rows (row 1 first).
    pub fn with_sheet<R, C>(self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid: Grid = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.lock().sheets.insert(name.to_string(), grid);
        self
    }

    /// Store numeric-looking cells of user-entered writes as numbers, so
    /// `00042` reads back as `42`.
    pub fn parsing_numbers(self) -> Self {
        self.lock().parse_numbers = true;
        self
    }

    /// Add an empty worksheet.
    pub fn add_sheet(&self, name: &str) {
        self.lock().sheets.entry(name.to_string()).or_default();
    }

    /// Current contents with trailing empty cells and rows trimmed.
    pub fn rows(&self, name: &str) -> Vec<Vec<String>> {
        let state = self.lock();
        match state.sheets.get(name) {
            Some(grid) => trim_grid(grid.clone()),
            None => Vec::new(),
        }
    }

    /// Rows below the header row.
    pub fn data_rows(&self, name: &str) -> Vec<Vec<String>> {
        self.rows(name).into_iter().skip(1).collect()
    }

    pub fn calls(&self) -> Vec<SheetCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn read_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_read()).count()
    }

    pub fn write_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_write()).count()
    }

    /// Fail the next `times` calls (of any kind) with `failure`.
    pub fn fail_next(&self, failure: InjectedFailure, times: usize) {
        let mut state = self.lock();
        for _ in 0..times {
            state.failures.push_back(failure);
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the store from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryState {
    fn record(&mut self, call: SheetCall) -> SheetsResult<()> {
        self.calls.push(call);
        match self.failures.pop_front() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn grid_mut(&mut self, range: &A1Range) -> SheetsResult<&mut Grid> {
        self.sheets.get_mut(&range.sheet).ok_or_else(|| {
            SheetsError::permanent(Some(400), format!("Unable to parse range: {}", range))
        })
    }

    /// Rows as the store keeps them after interpreting `input`.
    fn entered(&self, rows: &[Vec<String>], input: ValueInput) -> Grid {
        if !(self.parse_numbers && input == ValueInput::UserEntered) {
            return rows.to_vec();
        }
        rows.iter()
            .map(|row| row.iter().map(|cell| parse_number(cell)).collect())
            .collect()
    }

    fn update(
        &mut self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        let rows = &self.entered(rows, input);
        let top = range.start.row.unwrap_or(1);
        let left = range.start.column.unwrap_or(1);
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;

        if let Some(end) = range.end {
            if let Some(last_row) = end.row {
                if height > 0 && top + height - 1 > last_row {
                    return Err(SheetsError::permanent(
                        Some(400),
                        format!("{} rows do not fit in range {}", height, range),
                    ));
                }
            }
            if let Some(last_col) = end.column {
                if width > 0 && left + width - 1 > last_col {
                    return Err(SheetsError::permanent(
                        Some(400),
                        format!("{} columns do not fit in range {}", width, range),
                    ));
                }
            }
        }

        let grid = self.grid_mut(range)?;
        write_block(grid, top, left, rows);
        Ok(receipt(&range.sheet, top, left, height, width, rows))
    }
}

fn write_block(grid: &mut Grid, top: u32, left: u32, rows: &[Vec<String>]) {
    for (r, row) in rows.iter().enumerate() {
        let row_idx = (top - 1) as usize + r;
        if grid.len() <= row_idx {
            grid.resize(row_idx + 1, Vec::new());
        }
        let target = &mut grid[row_idx];
        for (c, value) in row.iter().enumerate() {
            let col_idx = (left - 1) as usize + c;
            if target.len() <= col_idx {
                target.resize(col_idx + 1, String::new());
            }
            target[col_idx] = value.clone();
        }
    }
}

fn receipt(
    sheet: &str,
    top: u32,
    left: u32,
    height: u32,
    width: u32,
    rows: &[Vec<String>],
) -> WriteReceipt {
    if height == 0 || width == 0 {
        return WriteReceipt::default();
    }
    WriteReceipt {
        updated_range: Some(A1Range {
            sheet: sheet.to_string(),
            start: CellRef::new(left, top),
            end: Some(CellRef::new(left + width - 1, top + height - 1)),
        }),
        updated_rows: height,
        updated_cells: rows.iter().map(|r| r.len() as u32).sum(),
    }
}

/// Unformatted rendering of a user-entered cell.
fn parse_number(cell: &str) -> String {
    let trimmed = cell.trim();
    let looks_numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E'))
        && trimmed.chars().any(|c| c.is_ascii_digit());
    match trimmed.parse::<f64>() {
        Ok(n) if looks_numeric && n.is_finite() => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", n as i64)
            } else {
                format!("{}", n)
            }
        }
        _ => cell.to_string(),
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

fn trim_grid(mut grid: Grid) -> Grid {
    for row in grid.iter_mut() {
        while row.last().is_some_and(|cell| cell.is_empty()) {
            row.pop();
        }
    }
    while grid.last().is_some_and(|row| row.is_empty()) {
        grid.pop();
    }
    grid
}

#[async_trait]
impl SheetsApi for MemorySheets {
    async fn get_values(&self, range: &A1Range) -> SheetsResult<Vec<Vec<String>>> {
        let mut state = self.lock();
        state.record(SheetCall::Get {
            range: range.to_string(),
        })?;
        let grid = state.grid_mut(range)?;

        let first_row = range.start.row.unwrap_or(1) as usize;
        let first_col = range.start.column.unwrap_or(1) as usize;
        let end = range.end.unwrap_or(range.start);
        let last_row = end.row.map(|r| r as usize).unwrap_or(grid.len());
        let max_width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let last_col = end.column.map(|c| c as usize).unwrap_or(max_width);

        let mut out = Vec::new();
        for row_idx in first_row..=last_row {
            let row = match grid.get(row_idx - 1) {
                Some(row) => row,
                None => break,
            };
            let cells: Vec<String> = (first_col..=last_col)
                .map(|c| row.get(c - 1).cloned().unwrap_or_default())
                .collect();
            out.push(cells);
        }
        Ok(trim_grid(out))
    }

    async fn append_rows(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        let mut state = self.lock();
        state.record(SheetCall::Append {
            range: range.to_string(),
            rows: rows.len(),
        })?;
        let rows = &state.entered(rows, input);
        let grid = state.grid_mut(range)?;

        let last_used = grid
            .iter()
            .rposition(|row| !is_blank(row))
            .map(|idx| idx + 1)
            .unwrap_or(0) as u32;
        let top = last_used + 1;
        let left = range.start.column.unwrap_or(1);
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;

        write_block(grid, top, left, rows);
        Ok(receipt(&range.sheet, top, left, height, width, rows))
    }

    async fn update_values(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        let mut state = self.lock();
        state.record(SheetCall::Update {
            range: range.to_string(),
            rows: rows.len(),
        })?;
        state.update(range, rows, input)
    }

    async fn batch_update(
        &self,
        data: &[ValueRange],
        input: ValueInput,
    ) -> SheetsResult<Vec<WriteReceipt>> {
        let mut state = self.lock();
        state.record(SheetCall::BatchUpdate {
            ranges: data.iter().map(|d| d.range.to_string()).collect(),
        })?;
        data.iter()
            .map(|entry| state.update(&entry.range, &entry.values, input))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemorySheets {
        MemorySheets::new().with_sheet(
            "Tickets",
            vec![
                vec!["tracking_code", "status"],
                vec!["AAA111111111", "pending"],
                vec!["", ""],
                vec!["BBB222222222"],
            ],
        )
    }

    #[tokio::test]
    async fn test_get_column_is_ragged() {
        let sheets = store();
        let values = sheets
            .get_values(&A1Range::column_from("Tickets", 2, 2))
            .await
            .unwrap();
        assert_eq!(values, vec![vec!["pending".to_string()]]);

        let keys = sheets
            .get_values(&A1Range::column_from("Tickets", 1, 2))
            .await
            .unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys[1].is_empty());
    }

    #[tokio::test]
    async fn test_append_goes_after_last_populated_row() {
        let sheets = store();
        let receipt = sheets
            .append_rows(
                &A1Range::columns("Tickets", 1, 2),
                &[vec!["CCC333333333".to_string(), "pending".to_string()]],
                ValueInput::UserEntered,
            )
            .await
            .unwrap();
        assert_eq!(receipt.first_row(), Some(5));
        assert_eq!(sheets.rows("Tickets")[4][0], "CCC333333333");
    }

    #[tokio::test]
    async fn test_bounded_update_rejects_overflow() {
        let sheets = store();
        let err = sheets
            .update_values(
                &A1Range::row_span("Tickets", 2, 1),
                &[vec!["A".to_string(), "B".to_string()]],
                ValueInput::UserEntered,
            )
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_unknown_sheet_is_permanent() {
        let sheets = store();
        let err = sheets
            .get_values(&A1Range::header_row("Nope"))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn test_parse_number_renders_unformatted() {
        assert_eq!(parse_number("123456789012"), "123456789012");
        assert_eq!(parse_number("00042"), "42");
        assert_eq!(parse_number("1.50"), "1.5");
        assert_eq!(parse_number("12E3"), "12000");
        assert_eq!(parse_number("A1B2C3D4E5F6"), "A1B2C3D4E5F6");
        assert_eq!(parse_number("inf"), "inf");
        assert_eq!(parse_number("2025-06-01"), "2025-06-01");
        assert_eq!(parse_number(""), "");
    }

    #[tokio::test]
    async fn test_numbers_parsed_only_for_user_entered_writes() {
        let sheets = store().parsing_numbers();
        let row = vec!["0042".to_string(), "pending".to_string()];
        sheets
            .update_values(
                &A1Range::row_span("Tickets", 2, 2),
                &[row.clone()],
                ValueInput::UserEntered,
            )
            .await
            .unwrap();
        sheets
            .update_values(
                &A1Range::row_span("Tickets", 3, 2),
                &[row],
                ValueInput::Raw,
            )
            .await
            .unwrap();
        let rows = sheets.data_rows("Tickets");
        assert_eq!(rows[0][0], "42");
        assert_eq!(rows[1][0], "0042");
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let sheets = store();
        sheets.fail_next(InjectedFailure::Quota, 1);
        let range = A1Range::header_row("Tickets");
        assert!(sheets.get_values(&range).await.unwrap_err().is_transient());
        assert!(sheets.get_values(&range).await.is_ok());
        assert_eq!(sheets.read_count(), 2);
    }
}
