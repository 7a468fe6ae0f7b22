//! A1 range addressing (`Sheet!A1:Z99`).
//!
//! Column labels use bijective base-26: 1 → `A`, 26 → `Z`, 27 → `AA`.
//! This is part of the wire contract with the remote store, so both
//! directions must be exact.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A1Error {
    #[error("Column number must be >= 1")]
    ZeroColumn,

    #[error("Invalid column label '{0}'")]
    InvalidLabel(String),

    #[error("Invalid A1 range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },
}

/// 1-based column number → spreadsheet column label.
pub fn column_label(column: u32) -> Result<String, A1Error> {
    if column == 0 {
        return Err(A1Error::ZeroColumn);
    }
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    // Only ASCII uppercase letters were pushed.
    Ok(letters.into_iter().map(char::from).collect())
}

/// Spreadsheet column label → 1-based column number. Case-insensitive.
pub fn column_number(label: &str) -> Result<u32, A1Error> {
    if label.is_empty() {
        return Err(A1Error::InvalidLabel(label.to_string()));
    }
    let mut n: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(A1Error::InvalidLabel(label.to_string()));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        n = n
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| A1Error::InvalidLabel(label.to_string()))?;
    }
    Ok(n)
}

/// One side of a range. Either part may be open (`A`, `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: Option<u32>,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column: Some(column),
            row: Some(row),
        }
    }

    pub fn column(column: u32) -> Self {
        Self {
            column: Some(column),
            row: None,
        }
    }

    pub fn row(row: u32) -> Self {
        Self {
            column: None,
            row: Some(row),
        }
    }

    fn parse(text: &str, whole: &str) -> Result<Self, A1Error> {
        let invalid = |reason: &str| A1Error::InvalidRange {
            range: whole.to_string(),
            reason: reason.to_string(),
        };
        let split = text
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(text.len());
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() && digits.is_empty() {
            return Err(invalid("empty cell reference"));
        }
        let column = if letters.is_empty() {
            None
        } else {
            Some(column_number(letters)?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            let row: u32 = digits
                .parse()
                .map_err(|_| invalid("row is not a number"))?;
            if row == 0 {
                return Err(invalid("rows start at 1"));
            }
            Some(row)
        };
        Ok(Self { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(column) = self.column {
            let label = column_label(column).map_err(|_| fmt::Error)?;
            f.write_str(&label)?;
        }
        if let Some(row) = self.row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// A range on a named worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

impl A1Range {
    /// `Sheet!1:1`
    pub fn header_row(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::row(1),
            end: Some(CellRef::row(1)),
        }
    }

    /// `Sheet!C2:C`: one column from `first_row` down to the last populated row.
    pub fn column_from(sheet: &str, column: u32, first_row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::new(column, first_row),
            end: Some(CellRef::column(column)),
        }
    }

    /// `Sheet!A5:V5`: a full row spanning columns `1..=last_column`.
    pub fn row_span(sheet: &str, row: u32, last_column: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::new(1, row),
            end: Some(CellRef::new(last_column, row)),
        }
    }

    /// `Sheet!A:V`
    pub fn columns(sheet: &str, first_column: u32, last_column: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::column(first_column),
            end: Some(CellRef::column(last_column)),
        }
    }

    /// `Sheet!B7`
    pub fn cell(sheet: &str, column: u32, row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::new(column, row),
            end: None,
        }
    }

    /// First row touched by this range, if bounded.
    pub fn first_row(&self) -> Option<u32> {
        self.start.row
    }

    /// Last row touched by this range, if bounded.
    pub fn last_row(&self) -> Option<u32> {
        match self.end {
            Some(end) => end.row,
            None => self.start.row,
        }
    }

    fn needs_quotes(sheet: &str) -> bool {
        sheet.is_empty() || !sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if Self::needs_quotes(&self.sheet) {
            write!(f, "'{}'", self.sheet.replace('\'', "''"))?;
        } else {
            f.write_str(&self.sheet)?;
        }
        write!(f, "!{}", self.start)?;
        if let Some(end) = self.end {
            write!(f, ":{}", end)?;
        }
        Ok(())
    }
}

impl FromStr for A1Range {
    type Err = A1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| A1Error::InvalidRange {
            range: s.to_string(),
            reason: reason.to_string(),
        };

        let (sheet, refs) = if let Some(quoted) = s.strip_prefix('\'') {
            // Quoted sheet name; '' is an escaped quote.
            let mut name = String::new();
            let mut chars = quoted.char_indices().peekable();
            let mut rest = None;
            while let Some((idx, ch)) = chars.next() {
                if ch == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        name.push('\'');
                        chars.next();
                        continue;
                    }
                    rest = Some(&quoted[idx + 1..]);
                    break;
                }
                name.push(ch);
            }
            let rest = rest.ok_or_else(|| invalid("unterminated sheet quote"))?;
            let refs = rest
                .strip_prefix('!')
                .ok_or_else(|| invalid("missing '!' after sheet name"))?;
            (name, refs)
        } else {
            let (sheet, refs) = s
                .split_once('!')
                .ok_or_else(|| invalid("missing '!' separator"))?;
            (sheet.to_string(), refs)
        };

        let (start, end) = match refs.split_once(':') {
            Some((a, b)) => (CellRef::parse(a, s)?, Some(CellRef::parse(b, s)?)),
            None => (CellRef::parse(refs, s)?, None),
        };

        Ok(Self { sheet, start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_label_boundaries() {
        assert_eq!(column_label(1).unwrap(), "A");
        assert_eq!(column_label(26).unwrap(), "Z");
        assert_eq!(column_label(27).unwrap(), "AA");
        assert_eq!(column_label(28).unwrap(), "AB");
        assert_eq!(column_label(52).unwrap(), "AZ");
        assert_eq!(column_label(53).unwrap(), "BA");
        assert_eq!(column_label(702).unwrap(), "ZZ");
        assert_eq!(column_label(703).unwrap(), "AAA");
        assert_eq!(column_label(18278).unwrap(), "ZZZ");
        assert_eq!(column_label(0), Err(A1Error::ZeroColumn));
    }

    #[test]
    fn test_column_number_inverts_label() {
        for n in 1..=2000 {
            let label = column_label(n).unwrap();
            assert_eq!(column_number(&label).unwrap(), n, "label {label}");
        }
        assert_eq!(column_number("aa").unwrap(), 27);
        assert!(column_number("A1").is_err());
        assert!(column_number("").is_err());
    }

    #[test]
    fn test_range_display() {
        assert_eq!(A1Range::header_row("Tickets").to_string(), "Tickets!1:1");
        assert_eq!(A1Range::column_from("Tickets", 3, 2).to_string(), "Tickets!C2:C");
        assert_eq!(A1Range::row_span("Tickets", 7, 22).to_string(), "Tickets!A7:V7");
        assert_eq!(A1Range::columns("Changes", 1, 3).to_string(), "Changes!A:C");
        assert_eq!(A1Range::cell("Tickets", 1, 1).to_string(), "Tickets!A1");
    }

    #[test]
    fn test_range_quotes_sheet_names() {
        let range = A1Range::cell("Bilet Talepleri", 1, 1);
        assert_eq!(range.to_string(), "'Bilet Talepleri'!A1");
        let range = A1Range::cell("Ops' log", 2, 3);
        assert_eq!(range.to_string(), "'Ops'' log'!B3");
    }

    #[test]
    fn test_range_parse() {
        let range: A1Range = "Tickets!A5:V5".parse().unwrap();
        assert_eq!(range, A1Range::row_span("Tickets", 5, 22));

        let range: A1Range = "'Ops'' log'!C2:C".parse().unwrap();
        assert_eq!(range.sheet, "Ops' log");
        assert_eq!(range.start, CellRef::new(3, 2));
        assert_eq!(range.end, Some(CellRef::column(3)));

        let range: A1Range = "Tickets!1:1".parse().unwrap();
        assert_eq!(range, A1Range::header_row("Tickets"));
        assert_eq!(range.first_row(), Some(1));
        assert_eq!(range.last_row(), Some(1));
    }

    #[test]
    fn test_range_parse_errors() {
        assert!("Tickets".parse::<A1Range>().is_err());
        assert!("Tickets!".parse::<A1Range>().is_err());
        assert!("Tickets!A0".parse::<A1Range>().is_err());
        assert!("'Tickets!A1".parse::<A1Range>().is_err());
    }
}
