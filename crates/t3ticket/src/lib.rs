//! T3 Ticket: ticket intake with spreadsheet mirroring.
//!
//! The database is authoritative. [`intake::Intake`] commits writes and hands
//! them to [`mirror::MirrorQueue`], whose single worker keeps the Tickets and
//! Changes worksheets in step through `t3ticket_sheets`.

pub mod intake;
pub mod listing;
pub mod mirror;
pub mod settings;

pub use intake::{Intake, StatusMirror};
pub use listing::TicketFilter;
pub use mirror::{MirrorHandle, MirrorJob, MirrorQueue, MirrorStats, STATUS_FIELDS};
pub use settings::{Connection, Settings};
