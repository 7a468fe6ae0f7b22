//! `status`: apply a status transition, then mirror it.

use anyhow::Result;
use clap::ValueEnum;

use t3ticket::{Settings, StatusMirror};
use t3ticket_db::DbError;
use t3ticket_protocol::{StatusChange, TicketStatus, TrackingCode};

use super::context::{block_on, parse_code, Session};
use super::error::HelpfulError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Ticketed,
    Rejected,
    Pending,
}

impl From<StatusArg> for TicketStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Ticketed => TicketStatus::Ticketed,
            StatusArg::Rejected => TicketStatus::Rejected,
            StatusArg::Pending => TicketStatus::Pending,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct StatusArgs {
    /// Tracking code of the ticket
    pub tracking_code: String,

    /// New status
    #[arg(value_enum)]
    pub status: StatusArg,

    /// PNR code (required for `ticketed`)
    #[arg(long)]
    pub pnr: Option<String>,

    /// Who bought the ticket
    #[arg(long)]
    pub purchased_by: Option<String>,

    /// Rejection reason (required for `rejected`)
    #[arg(long)]
    pub reason: Option<String>,

    /// Who rejected the request
    #[arg(long = "by")]
    pub rejected_by: Option<String>,

    /// Only overwrite the status cells of an existing sheet row
    #[arg(long)]
    pub patch: bool,
}

impl StatusArgs {
    fn change(&self) -> StatusChange {
        match self.status {
            StatusArg::Ticketed => StatusChange::Ticket {
                pnr_code: self.pnr.clone().unwrap_or_default(),
                purchased_by: self.purchased_by.clone(),
            },
            StatusArg::Rejected => StatusChange::Reject {
                reason: self.reason.clone().unwrap_or_default(),
                rejected_by: self.rejected_by.clone(),
            },
            StatusArg::Pending => StatusChange::Reset,
        }
    }
}

pub fn run(settings: &Settings, args: StatusArgs) -> Result<()> {
    let code = parse_code(&args.tracking_code)?;
    let mode = if args.patch {
        StatusMirror::Patch
    } else {
        StatusMirror::FullRow
    };
    block_on(run_async(settings, code, args.change(), mode))
}

async fn run_async(
    settings: &Settings,
    code: TrackingCode,
    change: StatusChange,
    mode: StatusMirror,
) -> Result<()> {
    let session = Session::open(settings, mode).await?;
    let ticket = match session.intake.set_status(&code, change).await {
        Ok(ticket) => ticket,
        Err(err) if err.is_not_found() => {
            return Err(HelpfulError::ticket_not_found(&code, &settings.db_path).into())
        }
        Err(DbError::Validation(err)) => {
            return Err(HelpfulError::new(format!("Status not changed: {}", err)).into())
        }
        Err(err) => return Err(HelpfulError::from_db(err, &settings.db_path).into()),
    };
    println!("Ticket {} is now {}", ticket.tracking_code, ticket.status);
    if let Some(pnr) = &ticket.pnr_code {
        println!("PNR: {}", pnr);
    }
    session.finish().await;
    Ok(())
}
