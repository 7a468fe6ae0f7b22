//! Shared types for T3 Ticket.
//!
//! Tickets and change requests live in the relational store; the sheet
//! sync engine only ever receives their [`Record`] projection.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod paths;
pub mod record;
pub mod source;
pub mod types;

pub use error::ValidationError;
pub use ids::{TrackingCode, TRACKING_CODE_LEN};
pub use record::{
    CellValue, Record, ToRecord, CHANGE_HEADERS, CHANGE_KEY_FIELD, TICKET_HEADERS,
    TICKET_KEY_FIELD,
};
pub use source::{RecordSource, StaticSource};
pub use types::{
    ChangeRecord, NewTicket, StatusChange, TicketRecord, TicketStatus, TripType, REASON_OTHER,
    TRANSPORT_PLANE,
};
