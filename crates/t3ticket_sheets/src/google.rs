//! Google Sheets v4 REST client.
//!
//! Raw HTTP against the values endpoints plus the service account
//! JWT-bearer grant. No SDK. Credentials are parsed and the first token is
//! minted on the first call, not at construction.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use t3ticket_protocol::defaults::{
    DEFAULT_CHANGES_WORKSHEET, DEFAULT_TICKETS_WORKSHEET, ENV_CHANGES_WORKSHEET,
    ENV_SERVICE_ACCOUNT_FILE, ENV_SERVICE_ACCOUNT_INFO, ENV_SERVICE_ACCOUNT_INFO_B64,
    ENV_SPREADSHEET_ID, ENV_TICKETS_WORKSHEET,
};

use crate::a1::A1Range;
use crate::api::{SheetsApi, ValueInput, ValueRange, WriteReceipt};
use crate::credentials::{CredentialSettings, ServiceAccountKey};
use crate::error::{SheetsError, SheetsResult};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before the reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Reads return numbers as entered rather than display-formatted, so a
/// key written as `123456789012` is not read back as `1.23457E+11`.
/// Dates keep their display form.
const READ_RENDER_OPTIONS: &[(&str, &str)] = &[
    ("valueRenderOption", "UNFORMATTED_VALUE"),
    ("dateTimeRenderOption", "FORMATTED_STRING"),
];

/// Remote store settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub credentials: CredentialSettings,
    pub tickets_worksheet: String,
    pub changes_worksheet: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            credentials: CredentialSettings::default(),
            tickets_worksheet: DEFAULT_TICKETS_WORKSHEET.to_string(),
            changes_worksheet: DEFAULT_CHANGES_WORKSHEET.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SheetsConfig {
    /// Read settings from the process environment. Missing values are left
    /// unset; they only become errors when a remote call needs them.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            spreadsheet_id: env_value(ENV_SPREADSHEET_ID),
            credentials: CredentialSettings {
                info_b64: env_value(ENV_SERVICE_ACCOUNT_INFO_B64),
                info_json: env_value(ENV_SERVICE_ACCOUNT_INFO),
                file: env_value(ENV_SERVICE_ACCOUNT_FILE).map(Into::into),
            },
            tickets_worksheet: env_value(ENV_TICKETS_WORKSHEET)
                .unwrap_or(defaults.tickets_worksheet),
            changes_worksheet: env_value(ENV_CHANGES_WORKSHEET)
                .unwrap_or(defaults.changes_worksheet),
            ..defaults
        }
    }

    pub fn spreadsheet_id(&self) -> SheetsResult<&str> {
        self.spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SheetsError::configuration(format!("{} is not set", ENV_SPREADSHEET_ID))
            })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Default)]
struct AuthState {
    key: Option<ServiceAccountKey>,
    token: Option<CachedToken>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: u32,
    #[serde(default)]
    updated_cells: u32,
}

impl From<UpdateResponse> for WriteReceipt {
    fn from(resp: UpdateResponse) -> Self {
        WriteReceipt {
            updated_range: resp.updated_range.and_then(|r| r.parse().ok()),
            updated_rows: resp.updated_rows,
            updated_cells: resp.updated_cells,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: UpdateResponse,
}

#[derive(Debug, Default, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    responses: Vec<UpdateResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValuesBody<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchBody<'a> {
    value_input_option: &'static str,
    data: Vec<ValuesBody<'a>>,
}

/// [`SheetsApi`] backed by the Google Sheets REST API.
pub struct GoogleSheetsClient {
    config: SheetsConfig,
    http_client: reqwest::Client,
    auth: Mutex<AuthState>,
}

impl GoogleSheetsClient {
    pub fn new(config: SheetsConfig) -> SheetsResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SheetsError::configuration(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            config,
            http_client,
            auth: Mutex::new(AuthState::default()),
        })
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Current access token, minting a new one when none is cached or the
    /// cached one is about to expire.
    async fn access_token(&self) -> SheetsResult<String> {
        let mut auth = self.auth.lock().await;
        if let Some(token) = &auth.token {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        if auth.key.is_none() {
            auth.key = Some(self.config.credentials.load()?);
        }
        let key = match &auth.key {
            Some(key) => key.clone(),
            None => return Err(SheetsError::configuration("service account not loaded")),
        };

        let token = self.fetch_token(&key).await?;
        let lifetime = Duration::from_secs(token.expires_in);
        let refresh_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "Obtained access token");
        auth.token = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at,
        });
        Ok(token.access_token)
    }

    async fn fetch_token(&self, key: &ServiceAccountKey) -> SheetsResult<TokenResponse> {
        let assertion = sign_assertion(key, chrono::Utc::now().timestamp())?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(&key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_api_error(status.as_u16(), &body);
            // A rejected grant is a credential problem, not a remote hiccup.
            return Err(match err {
                SheetsError::Permanent { message, .. } => SheetsError::configuration(format!(
                    "token request rejected ({}): {}",
                    status, message
                )),
                other => other,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SheetsError::permanent(None, format!("invalid token response: {}", e)))
    }

    fn values_url(&self, range: &str, suffix: Option<&str>) -> SheetsResult<Url> {
        let spreadsheet_id = self.config.spreadsheet_id()?;
        let mut url = Url::parse(&self.config.api_base).map_err(|e| {
            SheetsError::configuration(format!("invalid API base '{}': {}", self.config.api_base, e))
        })?;
        let last = match suffix {
            Some(suffix) => format!("{}:{}", range, suffix),
            None => range.to_string(),
        };
        url.path_segments_mut()
            .map_err(|_| SheetsError::configuration("API base cannot carry a path"))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values"])
            .push(&last);
        Ok(url)
    }

    fn read_request(&self, range: &A1Range) -> SheetsResult<reqwest::RequestBuilder> {
        let url = self.values_url(&range.to_string(), None)?;
        Ok(self.http_client.get(url).query(READ_RENDER_OPTIONS))
    }

    fn batch_url(&self) -> SheetsResult<Url> {
        let spreadsheet_id = self.config.spreadsheet_id()?;
        let mut url = Url::parse(&self.config.api_base).map_err(|e| {
            SheetsError::configuration(format!("invalid API base '{}': {}", self.config.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::configuration("API base cannot carry a path"))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values:batchUpdate"]);
        Ok(url)
    }

    async fn send<T>(&self, request: reqwest::RequestBuilder) -> SheetsResult<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body));
        }

        let text = response.text().await.map_err(transport_error)?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| SheetsError::permanent(Some(status.as_u16()), format!("invalid response: {}", e)))
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: i64) -> SheetsResult<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SPREADSHEETS_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        SheetsError::configuration(format!("service account private key is invalid: {}", e))
    })?;
    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| SheetsError::configuration(format!("failed to sign token assertion: {}", e)))
}

fn transport_error(err: reqwest::Error) -> SheetsError {
    let status = err.status().map(|s| s.as_u16());
    SheetsError::permanent(status, format!("request failed: {}", err))
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => (if b { "TRUE" } else { "FALSE" }).to_string(),
        serde_json::Value::Number(n) => number_text(&n),
        other => other.to_string(),
    }
}

/// Whole numbers print without a fractional part or exponent, matching
/// what was written.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "quotaExceeded"];

/// Map a non-success response to a classified error.
///
/// Transient: HTTP 429, `RESOURCE_EXHAUSTED`, or a 403 whose reason is a
/// rate/quota limit. Everything else is permanent.
pub fn classify_api_error(status: u16, body: &str) -> SheetsError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error;
    let message = if error.message.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        error.message
    };

    let rate_limited_403 = status == 403
        && error
            .errors
            .iter()
            .any(|detail| RATE_LIMIT_REASONS.contains(&detail.reason.as_str()));

    if status == 429 || error.status == "RESOURCE_EXHAUSTED" || rate_limited_403 {
        SheetsError::transient(Some(status), message)
    } else {
        SheetsError::permanent(Some(status), message)
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_values(&self, range: &A1Range) -> SheetsResult<Vec<Vec<String>>> {
        let resp: ValuesResponse = self.send(self.read_request(range)?).await?;
        Ok(resp
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append_rows(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        let range_text = range.to_string();
        let url = self.values_url(&range_text, Some("append"))?;
        let body = ValuesBody {
            range: range_text,
            major_dimension: "ROWS",
            values: rows,
        };
        let request = self
            .http_client
            .post(url)
            .query(&[
                ("valueInputOption", input.as_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body);
        let resp: AppendResponse = self.send(request).await?;
        Ok(resp.updates.into())
    }

    async fn update_values(
        &self,
        range: &A1Range,
        rows: &[Vec<String>],
        input: ValueInput,
    ) -> SheetsResult<WriteReceipt> {
        let range_text = range.to_string();
        let url = self.values_url(&range_text, None)?;
        let body = ValuesBody {
            range: range_text,
            major_dimension: "ROWS",
            values: rows,
        };
        let request = self
            .http_client
            .put(url)
            .query(&[("valueInputOption", input.as_str())])
            .json(&body);
        let resp: UpdateResponse = self.send(request).await?;
        Ok(resp.into())
    }

    async fn batch_update(
        &self,
        data: &[ValueRange],
        input: ValueInput,
    ) -> SheetsResult<Vec<WriteReceipt>> {
        let body = BatchBody {
            value_input_option: input.as_str(),
            data: data
                .iter()
                .map(|entry| ValuesBody {
                    range: entry.range.to_string(),
                    major_dimension: "ROWS",
                    values: &entry.values,
                })
                .collect(),
        };
        let request = self.http_client.post(self.batch_url()?).json(&body);
        let resp: BatchUpdateResponse = self.send(request).await?;
        Ok(resp.responses.into_iter().map(Into::into).collect())
    }
}
