//! `resync`: rewrite both worksheets from the database.

use anyhow::Result;
use tracing::info;

use t3ticket::Settings;

use super::context::{block_on, connect, open_db};
use super::error::HelpfulError;

#[derive(Debug, clap::Args)]
pub struct ResyncArgs {}

pub fn run(settings: &Settings, _args: ResyncArgs) -> Result<()> {
    block_on(run_async(settings))
}

async fn run_async(settings: &Settings) -> Result<()> {
    let db = open_db(settings).await?;
    let conn = connect(settings, "Resync")?;
    let report = conn
        .sync
        .resync(&db)
        .await
        .map_err(|e| HelpfulError::from_sheets("Resync", e))?;
    info!(
        tickets = report.tickets_rows,
        changes = report.changes_rows,
        "Resync finished"
    );

    println!(
        "{}: {} rows",
        settings.sheets.tickets_worksheet, report.tickets_rows
    );
    println!(
        "{}: {} rows",
        settings.sheets.changes_worksheet, report.changes_rows
    );
    if conn.memory.is_some() {
        println!("Dry run: nothing was written to Google Sheets.");
    }
    println!("Resync complete.");
    Ok(())
}
