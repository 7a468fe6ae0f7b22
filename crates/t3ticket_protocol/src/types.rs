//! Ticket request and change request types.
//!
//! These types are the single source of truth. The database layer stores
//! them, the sheet layer only sees their [`Record`] projection.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::TrackingCode;
use crate::record::{Record, ToRecord};

/// `reason` value meaning "other"; only then is `reason_other` kept.
pub const REASON_OTHER: &str = "diger";

/// `transport` value for flights; only then is `preferred_airline` kept.
pub const TRANSPORT_PLANE: &str = "plane";

// ============================================================================
// Enums
// ============================================================================

/// Status of a ticket request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Pending,
    Ticketed,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ticketed => "ticketed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "ticketed" => Ok(Self::Ticketed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ValidationError::UnknownStatus {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One-way or round trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWay => "oneway",
            Self::RoundTrip => "roundtrip",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "oneway" => Ok(Self::OneWay),
            "roundtrip" => Ok(Self::RoundTrip),
            _ => Err(ValidationError::UnknownTripType {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Fields supplied by the submitter. Everything else is assigned by the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub user_type: String,
    pub transport: String,
    pub reason: String,
    #[serde(default)]
    pub reason_other: Option<String>,
    #[serde(default)]
    pub preferred_airline: Option<String>,
    pub full_name: String,
    pub tc_no: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    #[serde(default)]
    pub departure_time: Option<NaiveTime>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default)]
    pub return_destination: Option<String>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub return_time: Option<NaiveTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A stored ticket request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub tracking_code: TrackingCode,
    pub user_type: String,
    pub transport: String,
    pub reason: String,
    pub reason_other: Option<String>,
    pub preferred_airline: Option<String>,
    pub full_name: String,
    pub tc_no: String,
    pub phone: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub flight_number: Option<String>,
    pub trip_type: TripType,
    pub return_destination: Option<String>,
    pub return_date: Option<NaiveDate>,
    pub return_time: Option<NaiveTime>,
    pub status: TicketStatus,
    pub pnr_code: Option<String>,
    pub notes: Option<String>,
    pub purchased_by: Option<String>,
    pub rejected_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketRecord {
    /// Build a pending ticket from submitted fields.
    pub fn from_new(tracking_code: TrackingCode, new: NewTicket, now: DateTime<Utc>) -> Self {
        let mut ticket = Self {
            tracking_code,
            user_type: new.user_type,
            transport: new.transport,
            reason: new.reason,
            reason_other: new.reason_other,
            preferred_airline: new.preferred_airline,
            full_name: new.full_name,
            tc_no: new.tc_no,
            phone: new.phone,
            email: new.email,
            birth_date: new.birth_date,
            origin: new.origin,
            destination: new.destination,
            travel_date: new.travel_date,
            departure_time: new.departure_time,
            flight_number: new.flight_number,
            trip_type: new.trip_type,
            return_destination: new.return_destination,
            return_date: new.return_date,
            return_time: new.return_time,
            status: TicketStatus::Pending,
            pnr_code: None,
            notes: new.notes,
            purchased_by: None,
            rejected_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        ticket.normalize();
        ticket
    }

    /// Drop dependent fields that do not apply.
    ///
    /// `reason_other` only survives when `reason` is "other", and
    /// `preferred_airline` only when travelling by plane.
    pub fn normalize(&mut self) {
        if self.reason != REASON_OTHER {
            self.reason_other = None;
        }
        if self.transport != TRANSPORT_PLANE {
            self.preferred_airline = None;
        }
    }

    /// Apply a status transition, clearing fields owned by other statuses.
    ///
    /// `pending → ticketed`, `pending → rejected` and `{ticketed, rejected} →
    /// pending` are the only transitions; anything else is rejected.
    pub fn apply(&mut self, change: StatusChange) -> Result<(), ValidationError> {
        let to = change.target();
        let allowed = matches!(
            (self.status, to),
            (TicketStatus::Pending, TicketStatus::Ticketed)
                | (TicketStatus::Pending, TicketStatus::Rejected)
                | (TicketStatus::Ticketed, TicketStatus::Pending)
                | (TicketStatus::Rejected, TicketStatus::Pending)
        );
        if !allowed {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        match change {
            StatusChange::Ticket {
                pnr_code,
                purchased_by,
            } => {
                let pnr = pnr_code.trim();
                if pnr.is_empty() {
                    return Err(ValidationError::MissingPnr);
                }
                self.pnr_code = Some(pnr.to_string());
                self.purchased_by = non_empty(purchased_by);
                self.rejected_by = None;
                self.rejection_reason = None;
            }
            StatusChange::Reject {
                reason,
                rejected_by,
            } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(ValidationError::MissingRejectionReason);
                }
                self.rejection_reason = Some(reason.to_string());
                self.rejected_by = non_empty(rejected_by);
                self.pnr_code = None;
                self.purchased_by = None;
            }
            StatusChange::Reset => {
                self.pnr_code = None;
                self.purchased_by = None;
                self.rejected_by = None;
                self.rejection_reason = None;
            }
        }
        self.status = to;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ToRecord for TicketRecord {
    fn to_record(&self) -> Record {
        Record::new()
            .with("tracking_code", self.tracking_code.as_str())
            .with("user_type", &self.user_type)
            .with("full_name", &self.full_name)
            .with("tc_no", &self.tc_no)
            .with("phone", &self.phone)
            .with("email", &self.email)
            .with("birth_date", self.birth_date)
            .with("origin", &self.origin)
            .with("destination", &self.destination)
            .with("travel_date", self.travel_date)
            .with("departure_time", self.departure_time)
            .with("flight_number", self.flight_number.clone())
            .with("trip_type", self.trip_type.as_str())
            .with("return_destination", self.return_destination.clone())
            .with("return_date", self.return_date)
            .with("return_time", self.return_time)
            .with("reason", &self.reason)
            .with("reason_other", self.reason_other.clone())
            .with("preferred_airline", self.preferred_airline.clone())
            .with("transport", &self.transport)
            .with("status", self.status.as_str())
            .with("pnr_code", self.pnr_code.clone())
            .with("notes", self.notes.clone())
            .with("created_at", self.created_at)
            .with("updated_at", self.updated_at)
            .with("purchased_by", self.purchased_by.clone())
            .with("rejected_by", self.rejected_by.clone())
            .with("rejection_reason", self.rejection_reason.clone())
    }
}

/// An administrative status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusChange {
    /// Mark as ticketed with the assigned PNR.
    #[serde(rename = "ticketed")]
    Ticket {
        pnr_code: String,
        #[serde(default)]
        purchased_by: Option<String>,
    },
    /// Reject with a reason.
    #[serde(rename = "rejected")]
    Reject {
        reason: String,
        #[serde(default)]
        rejected_by: Option<String>,
    },
    /// Back to pending, wiping all status-specific fields.
    #[serde(rename = "pending")]
    Reset,
}

impl StatusChange {
    pub fn target(&self) -> TicketStatus {
        match self {
            StatusChange::Ticket { .. } => TicketStatus::Ticketed,
            StatusChange::Reject { .. } => TicketStatus::Rejected,
            StatusChange::Reset => TicketStatus::Pending,
        }
    }
}

// ============================================================================
// Change requests
// ============================================================================

/// Immutable change request attached to one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub ticket_tracking_code: TrackingCode,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl ToRecord for ChangeRecord {
    fn to_record(&self) -> Record {
        Record::new()
            .with("ticket_tracking_code", self.ticket_tracking_code.as_str())
            .with("reason", &self.reason)
            .with("created_at", self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TICKET_HEADERS;
    use chrono::TimeZone;

    fn sample_new() -> NewTicket {
        NewTicket {
            user_type: "staff".into(),
            transport: "plane".into(),
            reason: "meeting".into(),
            reason_other: Some("should be dropped".into()),
            preferred_airline: Some("THY".into()),
            full_name: "Ayse Yilmaz".into(),
            tc_no: "12345678901".into(),
            phone: "555-123-45-67".into(),
            email: "ayse@example.com".into(),
            birth_date: None,
            origin: "Ankara".into(),
            destination: "Izmir".into(),
            travel_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            departure_time: NaiveTime::from_hms_opt(9, 30, 0),
            flight_number: None,
            trip_type: TripType::OneWay,
            return_destination: None,
            return_date: None,
            return_time: None,
            notes: None,
        }
    }

    fn sample_ticket() -> TicketRecord {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        TicketRecord::from_new(TrackingCode::parse("AAA111111111").unwrap(), sample_new(), now)
    }

    #[test]
    fn test_new_ticket_is_pending_and_normalized() {
        let ticket = sample_ticket();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.reason_other, None);
        assert_eq!(ticket.preferred_airline.as_deref(), Some("THY"));
    }

    #[test]
    fn test_non_plane_transport_drops_airline() {
        let mut new = sample_new();
        new.transport = "bus".into();
        let ticket = TicketRecord::from_new(TrackingCode::generate(), new, Utc::now());
        assert_eq!(ticket.preferred_airline, None);
    }

    #[test]
    fn test_reject_clears_pnr_and_purchaser() {
        let mut ticket = sample_ticket();
        ticket
            .apply(StatusChange::Ticket {
                pnr_code: "PNR123".into(),
                purchased_by: Some("Mehmet".into()),
            })
            .unwrap();
        ticket.apply(StatusChange::Reset).unwrap();
        // Re-seed stale values as if an older layout left them behind.
        ticket.pnr_code = Some("PNR123".into());
        ticket.purchased_by = Some("Mehmet".into());

        ticket
            .apply(StatusChange::Reject {
                reason: "duplicate request".into(),
                rejected_by: Some("Zeynep".into()),
            })
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Rejected);
        assert_eq!(ticket.pnr_code, None);
        assert_eq!(ticket.purchased_by, None);
        assert_eq!(ticket.rejection_reason.as_deref(), Some("duplicate request"));
        assert_eq!(ticket.rejected_by.as_deref(), Some("Zeynep"));
    }

    #[test]
    fn test_ticketed_clears_rejection_fields() {
        let mut ticket = sample_ticket();
        ticket.rejected_by = Some("Zeynep".into());
        ticket.rejection_reason = Some("stale".into());

        ticket
            .apply(StatusChange::Ticket {
                pnr_code: " ABC123 ".into(),
                purchased_by: None,
            })
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Ticketed);
        assert_eq!(ticket.pnr_code.as_deref(), Some("ABC123"));
        assert_eq!(ticket.rejected_by, None);
        assert_eq!(ticket.rejection_reason, None);
    }

    #[test]
    fn test_reset_clears_everything_status_specific() {
        let mut ticket = sample_ticket();
        ticket
            .apply(StatusChange::Reject {
                reason: "no budget".into(),
                rejected_by: Some("Zeynep".into()),
            })
            .unwrap();
        ticket.apply(StatusChange::Reset).unwrap();

        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.pnr_code, None);
        assert_eq!(ticket.purchased_by, None);
        assert_eq!(ticket.rejected_by, None);
        assert_eq!(ticket.rejection_reason, None);
    }

    #[test]
    fn test_transition_requirements() {
        let mut ticket = sample_ticket();
        assert_eq!(
            ticket.apply(StatusChange::Ticket {
                pnr_code: "  ".into(),
                purchased_by: None
            }),
            Err(ValidationError::MissingPnr)
        );
        assert_eq!(
            ticket.apply(StatusChange::Reject {
                reason: "".into(),
                rejected_by: None
            }),
            Err(ValidationError::MissingRejectionReason)
        );
        // A failed transition leaves the status untouched.
        assert_eq!(ticket.status, TicketStatus::Pending);
    }

    #[test]
    fn test_undefined_transitions_are_rejected() {
        let mut ticket = sample_ticket();
        assert!(matches!(
            ticket.apply(StatusChange::Reset),
            Err(ValidationError::InvalidTransition { .. })
        ));

        ticket
            .apply(StatusChange::Ticket {
                pnr_code: "PNR1".into(),
                purchased_by: None,
            })
            .unwrap();
        let err = ticket
            .apply(StatusChange::Reject {
                reason: "late".into(),
                rejected_by: None,
            })
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: TicketStatus::Ticketed,
                to: TicketStatus::Rejected
            }
        );
    }

    #[test]
    fn test_ticket_record_covers_canonical_headers() {
        let record = sample_ticket().to_record();
        for header in TICKET_HEADERS {
            assert!(record.get(header).is_some(), "missing field {header}");
        }
        assert_eq!(record.len(), TICKET_HEADERS.len());
        assert_eq!(record.cell("travel_date"), "2025-06-01");
        assert_eq!(record.cell("departure_time"), "09:30:00");
        assert_eq!(record.cell("pnr_code"), "");
        assert_eq!(record.cell("created_at"), "2025-05-01T12:00:00Z");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(TicketStatus::parse("Ticketed").unwrap(), TicketStatus::Ticketed);
        assert!(TicketStatus::parse("cancelled").is_err());
    }

    #[test]
    fn test_status_change_serde_tag() {
        let change: StatusChange =
            serde_json::from_str(r#"{"status":"rejected","reason":"late"}"#).unwrap();
        assert_eq!(change.target(), TicketStatus::Rejected);
    }
}
