//! `submit`: store a new ticket request read from JSON.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use t3ticket::{Settings, StatusMirror};
use t3ticket_protocol::NewTicket;

use super::context::{block_on, Session};
use super::error::HelpfulError;

#[derive(Debug, clap::Args)]
pub struct SubmitArgs {
    /// JSON file with the request fields, or `-` for stdin
    pub file: PathBuf,
}

fn read_request(path: &Path) -> Result<NewTicket> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).map_err(|e| {
        HelpfulError::new(format!("Invalid ticket request: {}", e))
            .with_context("Expected a JSON object with the ticket request fields")
            .into()
    })
}

pub fn run(settings: &Settings, args: SubmitArgs) -> Result<()> {
    let new = read_request(&args.file)?;
    block_on(run_async(settings, new))
}

async fn run_async(settings: &Settings, new: NewTicket) -> Result<()> {
    let session = Session::open(settings, StatusMirror::default()).await?;
    let ticket = session
        .intake
        .submit_ticket(new)
        .await
        .map_err(|e| HelpfulError::from_db(e, &settings.db_path))?;
    println!("Ticket created: {}", ticket.tracking_code);
    session.finish().await;
    Ok(())
}
