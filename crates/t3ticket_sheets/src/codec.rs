//! Row Codec: records ↔ header-ordered cell rows.

use std::collections::BTreeMap;

use t3ticket_protocol::Record;

/// Encode `record` as one cell per header, in header order.
///
/// Fields absent from the record, and empty values, become `""`. Record
/// fields with no matching header are dropped.
pub fn encode(record: &Record, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            let name = header.trim();
            if name.is_empty() {
                String::new()
            } else {
                record.cell(name)
            }
        })
        .collect()
}

/// Decode a raw sheet row against `headers`.
///
/// Short rows are right-padded with `""`; cells beyond the header are
/// ignored. Blank header cells are skipped and duplicate names keep their
/// first column.
pub fn decode(row: &[String], headers: &[String]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let name = header.trim();
        if name.is_empty() || fields.contains_key(name) {
            continue;
        }
        let value = row.get(idx).cloned().unwrap_or_default();
        fields.insert(name.to_string(), value);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use t3ticket_protocol::CellValue;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_follows_header_order() {
        let record = Record::new()
            .with("tracking_code", "AAA111111111")
            .with("status", "pending")
            .with("pnr_code", CellValue::Empty);
        let row = encode(&record, &headers(&["status", "pnr_code", "tracking_code", "notes"]));
        assert_eq!(row, vec!["pending", "", "AAA111111111", ""]);
    }

    #[test]
    fn test_encode_never_writes_none() {
        let pnr: Option<String> = None;
        let record = Record::new().with("pnr_code", pnr);
        let row = encode(&record, &headers(&["pnr_code"]));
        assert_eq!(row, vec![""]);
    }

    #[test]
    fn test_encode_blank_header_is_blank_cell() {
        let record = Record::new().with("a", "1");
        assert_eq!(encode(&record, &headers(&["a", " ", "b"])), vec!["1", "", ""]);
    }

    #[test]
    fn test_decode_pads_short_rows() {
        let fields = decode(
            &["AAA111111111".to_string()],
            &headers(&["tracking_code", "status", "pnr_code"]),
        );
        assert_eq!(fields["tracking_code"], "AAA111111111");
        assert_eq!(fields["status"], "");
        assert_eq!(fields["pnr_code"], "");
    }

    #[test]
    fn test_decode_truncates_long_rows() {
        let row: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let fields = decode(&row, &headers(&["x", "y"]));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["y"], "B");
    }
}
