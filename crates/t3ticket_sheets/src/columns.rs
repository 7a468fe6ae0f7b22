//! Column Index Resolver: header row → field positions.

use std::collections::HashMap;

use crate::a1::column_label;
use crate::error::{SheetsError, SheetsResult};

/// Field name → 1-based column position for one live header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: HashMap<String, u32>,
    key_field: String,
    key_column: u32,
    width: u32,
}

/// Trim header cells the same way record field names are trimmed.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    raw.iter().map(|h| h.trim().to_string()).collect()
}

/// Build the column index for `headers`, requiring `key_field` to be present.
///
/// Duplicate header names resolve to their first occurrence. A missing key
/// column is a configuration error: the sheet layout no longer matches the
/// application's field names.
pub fn resolve(headers: &[String], key_field: &str) -> SheetsResult<ColumnIndex> {
    let mut positions = HashMap::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let name = header.trim();
        if name.is_empty() {
            continue;
        }
        positions.entry(name.to_string()).or_insert(idx as u32 + 1);
    }

    let key_field = key_field.trim();
    let key_column = *positions.get(key_field).ok_or_else(|| {
        SheetsError::configuration(format!(
            "header row has no '{}' column (found: [{}])",
            key_field,
            headers.join(", ")
        ))
    })?;

    Ok(ColumnIndex {
        positions,
        key_field: key_field.to_string(),
        key_column,
        width: headers.len() as u32,
    })
}

impl ColumnIndex {
    pub fn position(&self, field: &str) -> Option<u32> {
        self.positions.get(field.trim()).copied()
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn key_column(&self) -> u32 {
        self.key_column
    }

    /// Number of header cells, i.e. the last column written for a full row.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn key_label(&self) -> SheetsResult<String> {
        Ok(column_label(self.key_column)?)
    }

    pub fn last_label(&self) -> SheetsResult<String> {
        Ok(column_label(self.width)?)
    }

    /// Required fields that the header row does not carry.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|field| !self.positions.contains_key(*field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_positions_are_one_based() {
        let index = resolve(&headers(&["full_name", "tracking_code", "status"]), "tracking_code")
            .unwrap();
        assert_eq!(index.position("full_name"), Some(1));
        assert_eq!(index.key_column(), 2);
        assert_eq!(index.key_label().unwrap(), "B");
        assert_eq!(index.last_label().unwrap(), "C");
        assert_eq!(index.position("pnr_code"), None);
    }

    #[test]
    fn test_resolve_trims_header_cells() {
        let index = resolve(&headers(&[" tracking_code ", "status "]), "tracking_code").unwrap();
        assert_eq!(index.key_column(), 1);
        assert_eq!(index.position("status"), Some(2));
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = resolve(&headers(&["full_name", "status"]), "tracking_code").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("tracking_code"));

        let err = resolve(&[], "tracking_code").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_duplicate_headers_first_wins() {
        let index =
            resolve(&headers(&["tracking_code", "status", "status"]), "tracking_code").unwrap();
        assert_eq!(index.position("status"), Some(2));
        assert_eq!(index.width(), 3);
    }

    #[test]
    fn test_blank_headers_keep_width() {
        let index = resolve(&headers(&["tracking_code", "", "status"]), "tracking_code").unwrap();
        assert_eq!(index.position("status"), Some(3));
        assert_eq!(index.width(), 3);
    }

    #[test]
    fn test_missing_required_columns() {
        let index = resolve(&headers(&["tracking_code", "status"]), "tracking_code").unwrap();
        assert_eq!(
            index.missing(&["tracking_code", "status", "pnr_code"]),
            vec!["pnr_code"]
        );
    }

    #[test]
    fn test_wide_sheet_label() {
        let mut names: Vec<String> = (1..=27).map(|i| format!("f{i}")).collect();
        names[0] = "tracking_code".to_string();
        let index = resolve(&names, "tracking_code").unwrap();
        assert_eq!(index.last_label().unwrap(), "AA");
    }
}
