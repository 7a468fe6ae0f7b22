//! Errors with context and suggestions for CLI users.

use std::fmt;
use std::path::Path;

use t3ticket_db::DbError;
use t3ticket_protocol::TrackingCode;
use t3ticket_sheets::SheetsError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn invalid_tracking_code(value: &str) -> Self {
        Self::new(format!("Invalid tracking code: '{}'", value))
            .with_context("Tracking codes are 12 characters of A-Z and 0-9")
    }

    pub fn ticket_not_found(code: &TrackingCode, db_path: &Path) -> Self {
        Self::new(format!("Ticket not found: {}", code))
            .with_context(format!("Database: {}", db_path.display()))
            .with_suggestion("TRY: Check the tracking code for typos")
            .with_suggestion("TRY: Pass --db if the tickets live in another database")
    }

    /// Wrap a sync failure with what the operator can do about it.
    pub fn from_sheets(action: &str, err: SheetsError) -> Self {
        let base = Self::new(format!("{} failed: {}", action, err));
        match &err {
            SheetsError::Configuration { .. } => base
                .with_suggestion("TRY: t3ticket config   # show what is configured")
                .with_suggestion("TRY: Set GOOGLE_SHEETS_SPREADSHEET_ID and one of the GOOGLE_SERVICE_ACCOUNT_* variables"),
            SheetsError::Transient { .. } => base
                .with_context("The spreadsheet quota was still exhausted after every retry")
                .with_suggestion("TRY: Wait a minute and run the command again"),
            SheetsError::NotFound { .. } => base
                .with_suggestion("TRY: t3ticket push <TRACKING_CODE>   # write the full row first"),
            SheetsError::Source { source, .. } => base.with_context(format!("Cause: {:#}", source)),
            _ => base,
        }
    }

    pub fn from_db(err: DbError, db_path: &Path) -> Self {
        Self::new(err.to_string()).with_context(format!("Database: {}", db_path.display()))
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
