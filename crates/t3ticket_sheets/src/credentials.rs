//! Service account credential loading.
//!
//! Sources are tried in order: inline base64 JSON, inline JSON, file path.
//! Nothing is read until the first remote call needs a token, so a
//! misconfigured process can still start and fail with a clear message on
//! first use.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{SheetsError, SheetsResult};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Raw credential settings as configured (env vars or CLI flags).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSettings {
    pub info_b64: Option<String>,
    pub info_json: Option<String>,
    pub file: Option<PathBuf>,
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("info_b64", &self.info_b64.as_ref().map(|_| "<redacted>"))
            .field("info_json", &self.info_json.as_ref().map(|_| "<redacted>"))
            .field("file", &self.file)
            .finish()
    }
}

/// The credential source that won the priority order.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    InlineBase64(String),
    InlineJson(String),
    File(PathBuf),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::InlineBase64(_) => f.write_str("InlineBase64(<redacted>)"),
            CredentialSource::InlineJson(_) => f.write_str("InlineJson(<redacted>)"),
            CredentialSource::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

impl CredentialSource {
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::InlineBase64(_) => "inline base64 JSON".to_string(),
            CredentialSource::InlineJson(_) => "inline JSON".to_string(),
            CredentialSource::File(path) => format!("file {}", path.display()),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CredentialSettings {
    /// Pick the first configured source. None configured is a
    /// configuration error.
    pub fn resolve(&self) -> SheetsResult<CredentialSource> {
        if let Some(b64) = present(&self.info_b64) {
            return Ok(CredentialSource::InlineBase64(b64.to_string()));
        }
        if let Some(json) = present(&self.info_json) {
            return Ok(CredentialSource::InlineJson(json.to_string()));
        }
        if let Some(path) = self.file.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return Ok(CredentialSource::File(expand_path(path)));
        }
        Err(SheetsError::configuration(
            "no service account credentials configured \
             (set GOOGLE_SERVICE_ACCOUNT_INFO_B64, GOOGLE_SERVICE_ACCOUNT_INFO or GOOGLE_SERVICE_ACCOUNT_FILE)",
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.resolve().is_ok()
    }

    /// Resolve and parse the service account key.
    pub fn load(&self) -> SheetsResult<ServiceAccountKey> {
        let source = self.resolve()?;
        let key = load_from(&source)?;
        tracing::debug!(source = %source.describe(), client_email = %key.client_email, "Loaded service account");
        Ok(key)
    }
}

/// Fields of a Google service account JSON key that the token grant uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Parse a key from an already-resolved source.
pub fn load_from(source: &CredentialSource) -> SheetsResult<ServiceAccountKey> {
    let json = match source {
        CredentialSource::InlineBase64(b64) => {
            let bytes = BASE64.decode(b64.as_bytes()).map_err(|e| {
                SheetsError::configuration(format!("service account base64 is invalid: {}", e))
            })?;
            String::from_utf8(bytes).map_err(|e| {
                SheetsError::configuration(format!("service account base64 is not UTF-8: {}", e))
            })?
        }
        CredentialSource::InlineJson(json) => json.clone(),
        CredentialSource::File(path) => {
            if !path.exists() {
                return Err(SheetsError::configuration(format!(
                    "service account file not found: {}",
                    path.display()
                )));
            }
            std::fs::read_to_string(path).map_err(|e| {
                SheetsError::configuration(format!(
                    "failed to read service account file {}: {}",
                    path.display(),
                    e
                ))
            })?
        }
    };

    serde_json::from_str(&json).map_err(|e| {
        SheetsError::configuration(format!(
            "service account JSON from {} is invalid: {}",
            source.describe(),
            e
        ))
    })
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references.
///
/// Unknown variables are left as written.
pub fn expand_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let expanded = expand_vars(&text);
    if expanded == "~" || expanded.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(expanded.trim_start_matches('~').trim_start_matches('/'));
        }
    }
    PathBuf::from(expanded)
}

fn expand_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[idx..idx + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}
