//! Canonical default values and environment variable names.

pub const DEFAULT_TICKETS_WORKSHEET: &str = "Tickets";
pub const DEFAULT_CHANGES_WORKSHEET: &str = "Changes";
pub const DEFAULT_DB_FILENAME: &str = "t3ticket.sqlite3";

pub const ENV_SPREADSHEET_ID: &str = "GOOGLE_SHEETS_SPREADSHEET_ID";
pub const ENV_SERVICE_ACCOUNT_INFO_B64: &str = "GOOGLE_SERVICE_ACCOUNT_INFO_B64";
pub const ENV_SERVICE_ACCOUNT_INFO: &str = "GOOGLE_SERVICE_ACCOUNT_INFO";
pub const ENV_SERVICE_ACCOUNT_FILE: &str = "GOOGLE_SERVICE_ACCOUNT_FILE";
pub const ENV_TICKETS_WORKSHEET: &str = "SHEETS_TICKETS_WORKSHEET";
pub const ENV_CHANGES_WORKSHEET: &str = "SHEETS_CHANGES_WORKSHEET";
pub const ENV_DB_PATH: &str = "T3TICKET_DB";
pub const ENV_HOME: &str = "T3TICKET_HOME";
