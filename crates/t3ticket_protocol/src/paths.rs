use std::path::{Path, PathBuf};
use std::sync::Once;

use crate::defaults::{DEFAULT_DB_FILENAME, ENV_HOME};

static CREATE_DIR_WARNED: Once = Once::new();

/// Resolve the T3 Ticket home directory.
///
/// Priority:
/// 1) T3TICKET_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.t3ticket
pub fn t3ticket_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(ENV_HOME) {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".t3ticket");
    }
    PathBuf::from(".").join(".t3ticket")
}

fn ensure_home_dir(home: &Path) {
    if let Err(err) = std::fs::create_dir_all(home) {
        CREATE_DIR_WARNED.call_once(|| {
            eprintln!(
                "Warning: failed to create T3 Ticket home directory {}: {}. Set {} or pass --db.",
                home.display(),
                err,
                ENV_HOME
            );
        });
    }
}

/// Default database path: ~/.t3ticket/t3ticket.sqlite3
pub fn default_db_path() -> PathBuf {
    let home = t3ticket_home();
    ensure_home_dir(&home);
    home.join(DEFAULT_DB_FILENAME)
}

/// Default logs directory: ~/.t3ticket/logs
pub fn default_logs_dir() -> PathBuf {
    let home = t3ticket_home();
    ensure_home_dir(&home);
    home.join("logs")
}
