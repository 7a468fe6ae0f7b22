//! Tracking code identifier for ticket requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;

/// Length of every tracking code.
pub const TRACKING_CODE_LEN: usize = 12;

/// Unique, immutable ticket identifier: 12 uppercase alphanumeric characters.
///
/// Generated once when a ticket is created and never reassigned. The code
/// is local and authoritative; nothing about it depends on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Generate a fresh code from the first 12 hex digits of a v4 UUID.
    ///
    /// A leading decimal digit is shifted to `G`..=`P` so the code never
    /// parses as a number when a spreadsheet reads it back.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let code: String = hex[..TRACKING_CODE_LEN]
            .char_indices()
            .map(|(i, c)| match c.to_digit(10) {
                Some(d) if i == 0 => char::from(b'G' + d as u8),
                _ => c.to_ascii_uppercase(),
            })
            .collect();
        Self(code)
    }

    /// Parse a code, accepting lowercase input and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let normalized = value.trim().to_ascii_uppercase();
        if normalized.len() != TRACKING_CODE_LEN
            || !normalized.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidTrackingCode {
                value: value.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrackingCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingCode> for String {
    fn from(code: TrackingCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let code = TrackingCode::generate();
        assert_eq!(code.as_str().len(), TRACKING_CODE_LEN);
        assert!(code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_never_starts_with_a_digit() {
        for _ in 0..500 {
            let code = TrackingCode::generate();
            let first = code.as_str().chars().next().unwrap();
            assert!(first.is_ascii_uppercase(), "{}", code);
            assert!(code.as_str().parse::<f64>().is_err());
            assert_eq!(TrackingCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn test_generate_is_unique_enough() {
        let a = TrackingCode::generate();
        let b = TrackingCode::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let code = TrackingCode::parse(" abc123def456 ").unwrap();
        assert_eq!(code.as_str(), "ABC123DEF456");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(TrackingCode::parse("SHORT").is_err());
        assert!(TrackingCode::parse("ABC123DEF45!").is_err());
        assert!(TrackingCode::parse("ABC123DEF4567").is_err());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let json = serde_json::to_string(&TrackingCode::parse("AAA111111111").unwrap()).unwrap();
        assert_eq!(json, "\"AAA111111111\"");
        let bad: Result<TrackingCode, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
