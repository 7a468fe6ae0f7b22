//! T3 Ticket CLI
//!
//! Usage:
//!   t3ticket resync                      # Rewrite both worksheets from the database
//!   t3ticket push <CODE>                 # Upsert one ticket row
//!   t3ticket status <CODE> ticketed --pnr XK92PQ
//!   t3ticket change <CODE> <REASON>...   # Record and append a change request
//!   t3ticket inspect <CODE>              # Diff the sheet row against the database
//!   t3ticket list --status pending       # Table of stored tickets

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use cli::config::SettingsArgs;

#[derive(Parser)]
#[command(name = "t3ticket")]
#[command(about = "Travel ticket requests mirrored into Google Sheets")]
#[command(version)]
struct Cli {
    /// Show info-level logs on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the Tickets and Changes worksheets from the database
    Resync(cli::resync::ResyncArgs),

    /// Upsert one stored ticket into the Tickets worksheet
    Push(cli::push::PushArgs),

    /// Store a new ticket request from JSON
    Submit(cli::submit::SubmitArgs),

    /// Change a ticket's status, then mirror it
    Status(cli::status::StatusArgs),

    /// Record a change request, then append it to the change log
    Change(cli::change::ChangeArgs),

    /// Compare a ticket's sheet row with the database
    Inspect(cli::inspect::InspectArgs),

    /// List stored tickets, optionally filtered
    List(cli::list::ListArgs),

    /// Show resolved configuration
    Config(cli::config::ConfigArgs),
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings.resolve();
    match cli.command {
        Commands::Resync(args) => cli::resync::run(&settings, args),
        Commands::Push(args) => cli::push::run(&settings, args),
        Commands::Submit(args) => cli::submit::run(&settings, args),
        Commands::Status(args) => cli::status::run(&settings, args),
        Commands::Change(args) => cli::change::run(&settings, args),
        Commands::Inspect(args) => cli::inspect::run(&settings, args),
        Commands::List(args) => cli::list::run(&settings, args),
        Commands::Config(args) => cli::config::run(&settings, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match t3ticket_logging::init_logging(t3ticket_logging::LogConfig {
        app_name: "t3ticket",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: logging disabled: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
