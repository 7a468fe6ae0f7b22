//! `change`: record a change request, then append it to the change log.

use anyhow::Result;

use t3ticket::{Settings, StatusMirror};
use t3ticket_db::DbError;
use t3ticket_protocol::TrackingCode;

use super::context::{block_on, parse_code, Session};
use super::error::HelpfulError;

#[derive(Debug, clap::Args)]
pub struct ChangeArgs {
    /// Tracking code of the ticket
    pub tracking_code: String,

    /// What should change
    #[arg(required = true, num_args = 1..)]
    pub reason: Vec<String>,
}

pub fn run(settings: &Settings, args: ChangeArgs) -> Result<()> {
    let code = parse_code(&args.tracking_code)?;
    let reason = args.reason.join(" ");
    block_on(run_async(settings, code, reason))
}

async fn run_async(settings: &Settings, code: TrackingCode, reason: String) -> Result<()> {
    let session = Session::open(settings, StatusMirror::default()).await?;
    let change = match session.intake.request_change(&code, &reason).await {
        Ok(change) => change,
        Err(err) if err.is_not_found() => {
            return Err(HelpfulError::ticket_not_found(&code, &settings.db_path).into())
        }
        Err(DbError::Validation(err)) => {
            return Err(HelpfulError::new(format!("Change not recorded: {}", err)).into())
        }
        Err(err) => return Err(HelpfulError::from_db(err, &settings.db_path).into()),
    };
    println!(
        "Change request #{} recorded for {}",
        change.id, change.ticket_tracking_code
    );
    session.finish().await;
    Ok(())
}
