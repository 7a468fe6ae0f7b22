//! Error types for the sheet sync engine.

use thiserror::Error;

use crate::a1::A1Error;

/// Result type for sheet operations.
pub type SheetsResult<T> = std::result::Result<T, SheetsError>;

/// Sheet sync errors with retry classification.
///
/// - `Configuration`: fatal, surfaced immediately, never retried
/// - `Transient`: rate-limit/quota signal, retried by the backoff executor
/// - `Permanent`: any other remote failure, propagated without retry
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Missing credentials, spreadsheet ID, or required header column
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Quota or rate limit hit - may succeed on retry
    #[error("Transient remote error ({}): {message}", describe_status(.status))]
    Transient { status: Option<u16>, message: String },

    /// Remote failure that retrying will not fix
    #[error("Remote error ({}): {message}", describe_status(.status))]
    Permanent { status: Option<u16>, message: String },

    /// Record cannot be written (e.g. empty key value)
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// No row carries the key value
    #[error("No row in '{sheet}' for key '{key}'")]
    NotFound { sheet: String, key: String },

    /// Malformed A1 range
    #[error("Range error: {0}")]
    Range(#[from] A1Error),

    /// Failure while reading records from the source of truth
    #[error("Failed to load {what}")]
    Source {
        what: String,
        #[source]
        source: anyhow::Error,
    },
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "no status".to_string(),
    }
}

impl SheetsError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn transient(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transient {
            status,
            message: message.into(),
        }
    }

    pub fn permanent(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Permanent {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Check if this error is transient (eligible for retry)
    pub fn is_transient(&self) -> bool {
        matches!(self, SheetsError::Transient { .. })
    }

    /// Check if this error is a permanent remote failure (no retry)
    pub fn is_permanent(&self) -> bool {
        matches!(self, SheetsError::Permanent { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SheetsError::Configuration { .. })
    }
}

impl From<anyhow::Error> for SheetsError {
    fn from(err: anyhow::Error) -> Self {
        SheetsError::Source {
            what: "records".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SheetsError::transient(Some(429), "quota").is_transient());
        assert!(!SheetsError::transient(Some(429), "quota").is_permanent());
        assert!(SheetsError::permanent(Some(400), "bad range").is_permanent());
        assert!(!SheetsError::configuration("no id").is_transient());
        assert!(SheetsError::configuration("no id").is_configuration());
    }

    #[test]
    fn test_display_includes_status() {
        let err = SheetsError::transient(Some(429), "Quota exceeded");
        assert_eq!(
            err.to_string(),
            "Transient remote error (HTTP 429): Quota exceeded"
        );
        let err = SheetsError::permanent(None, "connection reset");
        assert_eq!(err.to_string(), "Remote error (no status): connection reset");
    }

    #[test]
    fn test_source_display_leaves_cause_to_chain() {
        let err = SheetsError::from(anyhow::anyhow!("database is locked"));
        assert_eq!(err.to_string(), "Failed to load records");
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "database is locked");
    }
}
