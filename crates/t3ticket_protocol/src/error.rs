//! Validation errors for caller-side input.
//!
//! These are raised before anything reaches the sheet sync engine.

use thiserror::Error;

use crate::types::TicketStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid tracking code '{value}': expected 12 uppercase alphanumeric characters")]
    InvalidTrackingCode { value: String },

    #[error("Unknown ticket status '{value}'")]
    UnknownStatus { value: String },

    #[error("Unknown trip type '{value}'")]
    UnknownTripType { value: String },

    #[error("A PNR code is required to mark a ticket as ticketed")]
    MissingPnr,

    #[error("A rejection reason is required to reject a ticket")]
    MissingRejectionReason,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("Change request reason must not be empty")]
    EmptyChangeReason,
}
