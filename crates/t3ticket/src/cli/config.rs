//! Configuration flags and the `config` command.
//!
//! Every setting is a global flag with an environment fallback. Nothing
//! here talks to the network.

use std::path::PathBuf;

use t3ticket::Settings;
use t3ticket_protocol::defaults::{
    DEFAULT_CHANGES_WORKSHEET, DEFAULT_TICKETS_WORKSHEET, ENV_CHANGES_WORKSHEET, ENV_DB_PATH,
    ENV_SERVICE_ACCOUNT_FILE, ENV_SERVICE_ACCOUNT_INFO, ENV_SERVICE_ACCOUNT_INFO_B64,
    ENV_SPREADSHEET_ID, ENV_TICKETS_WORKSHEET,
};
use t3ticket_protocol::paths::{default_db_path, t3ticket_home};
use t3ticket_sheets::{CredentialSettings, SheetsConfig};

pub use t3ticket_logging::logs_dir;

/// Settings shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct SettingsArgs {
    /// SQLite database holding tickets and change requests
    #[arg(long, global = true, env = ENV_DB_PATH, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Target spreadsheet
    #[arg(long, global = true, env = ENV_SPREADSHEET_ID, value_name = "ID")]
    pub spreadsheet_id: Option<String>,

    #[arg(long, global = true, env = ENV_TICKETS_WORKSHEET, default_value = DEFAULT_TICKETS_WORKSHEET)]
    pub tickets_worksheet: String,

    #[arg(long, global = true, env = ENV_CHANGES_WORKSHEET, default_value = DEFAULT_CHANGES_WORKSHEET)]
    pub changes_worksheet: String,

    /// Service account key file (`~` and `$VAR` are expanded)
    #[arg(long, global = true, env = ENV_SERVICE_ACCOUNT_FILE, value_name = "PATH")]
    pub service_account_file: Option<PathBuf>,

    /// Service account key as inline JSON
    #[arg(long, global = true, env = ENV_SERVICE_ACCOUNT_INFO, hide_env_values = true, value_name = "JSON")]
    pub service_account_info: Option<String>,

    /// Service account key as base64-encoded JSON
    #[arg(long, global = true, env = ENV_SERVICE_ACCOUNT_INFO_B64, hide_env_values = true, value_name = "B64")]
    pub service_account_info_b64: Option<String>,

    /// Mirror into an in-memory sheet instead of Google Sheets
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl SettingsArgs {
    pub fn resolve(&self) -> Settings {
        let db_path = self.db.clone().unwrap_or_else(default_db_path);
        Settings {
            db_path,
            sheets: SheetsConfig {
                spreadsheet_id: self.spreadsheet_id.clone(),
                credentials: CredentialSettings {
                    info_b64: self.service_account_info_b64.clone(),
                    info_json: self.service_account_info.clone(),
                    file: self.service_account_file.clone(),
                },
                tickets_worksheet: self.tickets_worksheet.clone(),
                changes_worksheet: self.changes_worksheet.clone(),
                ..SheetsConfig::default()
            },
            dry_run: self.dry_run,
        }
    }
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

fn credential_summary(settings: &Settings) -> String {
    match settings.sheets.credentials.resolve() {
        Ok(source) => source.describe(),
        Err(_) => "not configured".to_string(),
    }
}

/// Show resolved settings. Inline credentials are never printed.
pub fn run(settings: &Settings, args: ConfigArgs) -> anyhow::Result<()> {
    let home = t3ticket_home();
    let logs = logs_dir();
    let spreadsheet = settings.sheets.spreadsheet_id().ok();
    let credentials = credential_summary(settings);

    if args.json {
        let config = serde_json::json!({
            "home": home.to_string_lossy(),
            "database": {
                "path": settings.db_path.to_string_lossy(),
                "exists": settings.db_path.exists(),
            },
            "logs": logs.to_string_lossy(),
            "sheets": {
                "spreadsheet_id": spreadsheet,
                "tickets_worksheet": settings.sheets.tickets_worksheet,
                "changes_worksheet": settings.sheets.changes_worksheet,
                "credentials": credentials,
                "mirroring_enabled": settings.mirroring_enabled(),
            },
            "dry_run": settings.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("T3 Ticket Configuration");
    println!("=======================");
    println!();
    println!("Home:           {}", home.display());
    println!(
        "Database:       {} {}",
        settings.db_path.display(),
        if settings.db_path.exists() { "[OK]" } else { "[NOT FOUND]" }
    );
    println!("Logs:           {}", logs.display());
    println!();
    println!("Spreadsheet:    {}", spreadsheet.unwrap_or("(not set)"));
    println!("Tickets sheet:  {}", settings.sheets.tickets_worksheet);
    println!("Changes sheet:  {}", settings.sheets.changes_worksheet);
    println!("Credentials:    {}", credentials);
    if settings.dry_run {
        println!("Mode:           dry run (in-memory sheet)");
    } else if !settings.mirroring_enabled() {
        println!("Mode:           mirroring disabled (no spreadsheet)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SettingsArgs {
        SettingsArgs {
            db: Some(PathBuf::from("/tmp/t3.sqlite3")),
            spreadsheet_id: None,
            tickets_worksheet: DEFAULT_TICKETS_WORKSHEET.to_string(),
            changes_worksheet: DEFAULT_CHANGES_WORKSHEET.to_string(),
            service_account_file: None,
            service_account_info: None,
            service_account_info_b64: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_resolve_carries_flags() {
        let mut a = args();
        a.spreadsheet_id = Some("sheet-1".into());
        a.tickets_worksheet = "Biletler".into();
        let settings = a.resolve();
        assert_eq!(settings.db_path, PathBuf::from("/tmp/t3.sqlite3"));
        assert_eq!(settings.sheets.spreadsheet_id().unwrap(), "sheet-1");
        assert_eq!(settings.sheets.tickets_worksheet, "Biletler");
        assert_eq!(settings.sheets.changes_worksheet, "Changes");
    }

    #[test]
    fn test_credential_summary_never_shows_inline_values() {
        let mut a = args();
        a.service_account_info = Some("{\"private_key\":\"secret\"}".into());
        let summary = credential_summary(&a.resolve());
        assert_eq!(summary, "inline JSON");
        assert!(!summary.contains("secret"));

        assert_eq!(credential_summary(&args().resolve()), "not configured");
    }
}
