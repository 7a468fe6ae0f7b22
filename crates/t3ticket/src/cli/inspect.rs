//! `inspect`: read a ticket's sheet row back and compare it with the
//! database.

use std::collections::BTreeMap;

use anyhow::Result;
use comfy_table::Color;
use serde::Serialize;

use t3ticket::Settings;
use t3ticket_protocol::{Record, ToRecord, TrackingCode, TICKET_HEADERS};

use super::context::{block_on, connect, open_db, parse_code};
use super::error::HelpfulError;
use super::output::{print_table_colored, truncate};

#[derive(Debug, clap::Args)]
pub struct InspectArgs {
    /// Tracking code of the ticket
    pub tracking_code: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    /// `None` when the database has no such field.
    pub database: Option<String>,
    /// `None` when the sheet has no such column.
    pub sheet: Option<String>,
}

impl FieldDiff {
    pub fn matches(&self) -> bool {
        self.database == self.sheet
    }
}

#[derive(Debug, Serialize)]
struct InspectOutput<'a> {
    tracking_code: &'a str,
    row: Option<u32>,
    fields: &'a [FieldDiff],
    mismatched: usize,
}

/// Compare a record with a decoded sheet row, canonical fields first,
/// then any extra sheet columns.
pub fn diff_row(record: &Record, sheet: &BTreeMap<String, String>) -> Vec<FieldDiff> {
    let mut order: Vec<String> = TICKET_HEADERS.iter().map(|h| h.to_string()).collect();
    for (field, _) in record.iter() {
        if !order.iter().any(|o| o == field) {
            order.push(field.to_string());
        }
    }
    for field in sheet.keys() {
        if !order.iter().any(|o| o == field) {
            order.push(field.clone());
        }
    }

    order
        .into_iter()
        .map(|field| FieldDiff {
            database: record.get(&field).map(|v| v.to_cell_string()),
            sheet: sheet.get(&field).cloned(),
            field,
        })
        .collect()
}

pub fn run(settings: &Settings, args: InspectArgs) -> Result<()> {
    let code = parse_code(&args.tracking_code)?;
    block_on(run_async(settings, code, args.json))
}

async fn run_async(settings: &Settings, code: TrackingCode, json: bool) -> Result<()> {
    let db = open_db(settings).await?;
    let Some(ticket) = db.get_ticket(&code).await? else {
        return Err(HelpfulError::ticket_not_found(&code, &settings.db_path).into());
    };

    let conn = connect(settings, "Inspect")?;
    let found = conn
        .sync
        .find_ticket(code.as_str())
        .await
        .map_err(|e| HelpfulError::from_sheets("Inspect", e))?;

    let empty = BTreeMap::new();
    let sheet_fields = found.as_ref().map(|f| &f.fields).unwrap_or(&empty);
    let diffs = diff_row(&ticket.to_record(), sheet_fields);
    let mismatched = diffs.iter().filter(|d| !d.matches()).count();

    if json {
        let output = InspectOutput {
            tracking_code: code.as_str(),
            row: found.as_ref().map(|f| f.row),
            fields: &diffs,
            mismatched,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(found) = found else {
        println!(
            "Ticket {} has no row in {}. Run `t3ticket push {}` to create it.",
            code, settings.sheets.tickets_worksheet, code
        );
        return Ok(());
    };

    println!(
        "Ticket {} is row {} of {}",
        code, found.row, settings.sheets.tickets_worksheet
    );
    let rows = diffs
        .iter()
        .map(|d| {
            let color = if d.matches() { None } else { Some(Color::Red) };
            vec![
                (d.field.clone(), color),
                (truncate(d.database.as_deref().unwrap_or("-"), 40), None),
                (truncate(d.sheet.as_deref().unwrap_or("-"), 40), color),
            ]
        })
        .collect();
    print_table_colored(&["field", "database", "sheet"], rows);

    if mismatched == 0 {
        println!("Sheet row matches the database.");
    } else {
        println!("{} field(s) differ.", mismatched);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_row_flags_mismatches_and_missing_columns() {
        let record = Record::new()
            .with("tracking_code", "AAA111111111")
            .with("status", "ticketed")
            .with("pnr_code", "PNR1");
        let sheet: BTreeMap<String, String> = [
            ("tracking_code", "AAA111111111"),
            ("status", "pending"),
            ("extra", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let diffs = diff_row(&record, &sheet);
        let find = |name: &str| diffs.iter().find(|d| d.field == name).unwrap();

        assert!(find("tracking_code").matches());
        assert!(!find("status").matches());
        assert_eq!(find("pnr_code").sheet, None);
        assert_eq!(find("extra").database, None);
        assert_eq!(diffs.last().unwrap().field, "extra");
        assert_eq!(diffs[0].field, "tracking_code");
    }
}
