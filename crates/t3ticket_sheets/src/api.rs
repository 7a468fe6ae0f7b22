//! Remote tabular store interface.
//!
//! The sync engine talks to the store only through [`SheetsApi`]. The
//! Google implementation lives in [`crate::google`]; [`crate::memory`]
//! provides an in-process store for dry runs and tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::a1::A1Range;
use crate::error::SheetsResult;

/// How the store interprets written strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInput {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed into the UI (dates, numbers).
    UserEntered,
}

impl ValueInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// Values for one explicit range in a batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub range: A1Range,
    pub values: Vec<Vec<String>>,
}

/// What the store reports after a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    pub updated_range: Option<A1Range>,
    pub updated_rows: u32,
    pub updated_cells: u32,
}

impl WriteReceipt {
    /// First sheet row touched by the write, when the store reported it.
    pub fn first_row(&self) -> Option<u32> {
        self.updated_range.as_ref().and_then(A1Range::first_row)
    }
}

#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read a range. Rows come back with trailing empty cells trimmed and
    /// trailing empty rows dropped, so results may be ragged.
    async fn get_values(&self, range: &A1Range) -> SheetsResult<Vec<Vec<String>>>;

    /// Append rows after the last populated row of the table in `range`.
    async fn append_rows(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt>;

    /// Overwrite an explicit range, anchored at its top-left cell.
    async fn update_values(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt>;

    /// Overwrite several explicit ranges in one request.
    async fn batch_update(
        &self,
        data: &[ValueRange],
        input: ValueInput,
    ) -> SheetsResult<Vec<WriteReceipt>>;
}

#[async_trait]
impl<T: SheetsApi + ?Sized> SheetsApi for Arc<T> {
    async fn get_values(&self, range: &A1Range) -> SheetsResult<Vec<Vec<String>>> {
        (**self).get_values(range).await
    }

    async fn append_rows(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        (**self).append_rows(range, rows, input).await
    }

    async fn update_values(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        (**self).update_values(range, rows, input).await
    }

    async fn batch_update(
        &self,
        data: &[ValueRange],
        input: ValueInput,
    ) -> SheetsResult<Vec<WriteReceipt>> {
        (**self).batch_update(data, input).await
    }
}
