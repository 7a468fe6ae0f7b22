//! Loosely-typed records handed to the sheet sync engine.
//!
//! A [`Record`] is a field-name → [`CellValue`] mapping. The engine only
//! ever sees records; it never knows about ticket structs.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical Tickets worksheet layout. Used for full resync and as the
/// expected header row of the upsert-keyed target.
pub const TICKET_HEADERS: &[&str] = &[
    "tracking_code",
    "user_type",
    "full_name",
    "tc_no",
    "phone",
    "email",
    "birth_date",
    "origin",
    "destination",
    "travel_date",
    "departure_time",
    "flight_number",
    "trip_type",
    "return_destination",
    "return_date",
    "return_time",
    "reason",
    "reason_other",
    "preferred_airline",
    "transport",
    "status",
    "pnr_code",
    "notes",
    "created_at",
    "updated_at",
    "purchased_by",
    "rejected_by",
    "rejection_reason",
];

/// Canonical Changes worksheet layout (append-only log).
pub const CHANGE_HEADERS: &[&str] = &["ticket_tracking_code", "reason", "created_at"];

/// Key field of the Tickets worksheet.
pub const TICKET_KEY_FIELD: &str = "tracking_code";

/// Column every Changes row must carry.
pub const CHANGE_KEY_FIELD: &str = "ticket_tracking_code";

/// A scalar cell value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
}

impl CellValue {
    /// Canonical string form written into a sheet cell.
    ///
    /// `Empty` is always the empty string, never a placeholder word.
    pub fn to_cell_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Decimal(d) => d.normalize().to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Time(t) => t.format("%H:%M:%S").to_string(),
            CellValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cell_string())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&String> for CellValue {
    fn from(value: &String) -> Self {
        CellValue::Text(value.clone())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Decimal(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(value: NaiveTime) -> Self {
        CellValue::Time(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::DateTime(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Field-name → value mapping handed to the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into().trim().to_string(), value.into());
    }

    /// Look up a field. Names are compared after trimming.
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field.trim())
    }

    /// Cell string for a field; absent fields are empty.
    pub fn cell(&self, field: &str) -> String {
        self.get(field)
            .map(CellValue::to_cell_string)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Types that can be projected into a sheet [`Record`].
pub trait ToRecord {
    fn to_record(&self) -> Record;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_values_encode_as_empty_string() {
        assert_eq!(CellValue::Empty.to_cell_string(), "");
        let none: Option<String> = None;
        assert_eq!(CellValue::from(none).to_cell_string(), "");
    }

    #[test]
    fn test_temporal_values_use_iso_forms() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let time = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        let dt = date.and_time(time).and_utc();

        assert_eq!(CellValue::from(date).to_cell_string(), "2025-03-09");
        assert_eq!(CellValue::from(time).to_cell_string(), "07:05:00");
        assert_eq!(CellValue::from(dt).to_cell_string(), "2025-03-09T07:05:00Z");
    }

    #[test]
    fn test_decimal_canonical_form() {
        let d = Decimal::from_str("1250.500").unwrap();
        assert_eq!(CellValue::from(d).to_cell_string(), "1250.5");
        assert_eq!(CellValue::from(42i64).to_cell_string(), "42");
    }

    #[test]
    fn test_record_trims_field_names() {
        let record = Record::new().with(" tracking_code ", "AAA111111111");
        assert_eq!(record.cell("tracking_code"), "AAA111111111");
        assert_eq!(record.cell("  tracking_code"), "AAA111111111");
        assert_eq!(record.cell("missing"), "");
    }

    #[test]
    fn test_canonical_headers_contain_keys() {
        assert!(TICKET_HEADERS.contains(&TICKET_KEY_FIELD));
        assert!(CHANGE_HEADERS.contains(&CHANGE_KEY_FIELD));
    }
}
