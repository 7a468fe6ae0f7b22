//! Command-line interface for T3 Ticket.

pub mod change;
pub mod config;
pub mod context;
pub mod error;
pub mod inspect;
pub mod list;
pub mod output;
pub mod push;
pub mod resync;
pub mod status;
pub mod submit;
