//! `list`: show stored tickets, filtered by status or searched by text.

use anyhow::Result;
use comfy_table::Color;

use t3ticket::{listing, Settings, TicketFilter};
use t3ticket_protocol::{TicketRecord, TicketStatus};

use super::context::{block_on, open_db};
use super::error::HelpfulError;
use super::output::{print_table_colored, truncate};
use super::status::StatusArg;

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Only tickets with this status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// Only tickets with this transport (e.g. plane, bus)
    #[arg(long)]
    pub transport: Option<String>,

    /// Only tickets from this kind of requester
    #[arg(long)]
    pub user_type: Option<String>,

    /// Text to find in the name, tracking code or PNR
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    fn filter(&self) -> TicketFilter {
        TicketFilter {
            status: self.status.map(Into::into),
            transport: self.transport.clone(),
            user_type: self.user_type.clone(),
            search: self.search.clone(),
        }
    }
}

const COLUMNS: [&str; 7] = [
    "tracking_code",
    "status",
    "full_name",
    "transport",
    "route",
    "travel_date",
    "pnr_code",
];

fn status_color(status: TicketStatus) -> Option<Color> {
    match status {
        TicketStatus::Pending => Some(Color::Yellow),
        TicketStatus::Ticketed => Some(Color::Green),
        TicketStatus::Rejected => Some(Color::Red),
    }
}

fn table_row(ticket: &TicketRecord) -> Vec<(String, Option<Color>)> {
    vec![
        (ticket.tracking_code.to_string(), None),
        (ticket.status.to_string(), status_color(ticket.status)),
        (truncate(&ticket.full_name, 30), None),
        (ticket.transport.clone(), None),
        (
            truncate(&format!("{} -> {}", ticket.origin, ticket.destination), 40),
            None,
        ),
        (ticket.travel_date.to_string(), None),
        (ticket.pnr_code.clone().unwrap_or_else(|| "-".into()), None),
    ]
}

pub fn run(settings: &Settings, args: ListArgs) -> Result<()> {
    block_on(run_async(settings, args.filter(), args.json))
}

async fn run_async(settings: &Settings, filter: TicketFilter, json: bool) -> Result<()> {
    let db = open_db(settings).await?;
    let tickets = listing::list_tickets(&db, &filter)
        .await
        .map_err(|e| HelpfulError::from_db(e, &settings.db_path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tickets)?);
        return Ok(());
    }

    if tickets.is_empty() {
        println!("No tickets match.");
        return Ok(());
    }
    print_table_colored(&COLUMNS, tickets.iter().map(table_row).collect());
    println!("{} ticket(s)", tickets.len());
    Ok(())
}
