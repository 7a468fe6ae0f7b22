//! `push`: upsert one stored ticket into the Tickets worksheet.

use anyhow::Result;

use t3ticket::Settings;
use t3ticket_protocol::TrackingCode;

use super::context::{block_on, connect, open_db, parse_code};
use super::error::HelpfulError;

#[derive(Debug, clap::Args)]
pub struct PushArgs {
    /// Tracking code of the ticket
    pub tracking_code: String,
}

pub fn run(settings: &Settings, args: PushArgs) -> Result<()> {
    let code = parse_code(&args.tracking_code)?;
    block_on(run_async(settings, code))
}

async fn run_async(settings: &Settings, code: TrackingCode) -> Result<()> {
    let db = open_db(settings).await?;
    let Some(ticket) = db.get_ticket(&code).await? else {
        return Err(HelpfulError::ticket_not_found(&code, &settings.db_path).into());
    };

    let conn = connect(settings, "Push")?;
    let outcome = conn
        .sync
        .upsert_ticket(&ticket)
        .await
        .map_err(|e| HelpfulError::from_sheets("Push", e))?;

    println!(
        "Ticket {} {} at row {} of {}",
        code,
        outcome.action.as_str(),
        outcome.row,
        settings.sheets.tickets_worksheet
    );
    Ok(())
}
