use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the attendee email and the talk code
pub const PAYLOAD_DELIMITER: char = '|';

/// Attendee/talk pair carried by a check-in QR code (`email|eventCode`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanPayload {
    pub email: String,
    pub event_code: String,
}

impl ScanPayload {
    pub fn new<E: Into<String>, C: Into<String>>(email: E, event_code: C) -> Self {
        Self {
            email: email.into(),
            event_code: event_code.into(),
        }
    }

    /// Parse decoded QR text. Both leading parts must be non-empty; extra parts are ignored.
    pub fn parse(text: &str) -> Result<Self, ScanError> {
        let mut parts = text.trim().split(PAYLOAD_DELIMITER);
        match (parts.next(), parts.next()) {
            (Some(email), Some(code)) if !email.is_empty() && !code.is_empty() => {
                Ok(Self::new(email, code))
            }
            _ => Err(ScanError::InvalidFormat {
                text: text.to_string(),
            }),
        }
    }

    /// Identity used for deduplication, identical to the encoded QR text
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScanPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.email, PAYLOAD_DELIMITER, self.event_code)
    }
}

impl FromStr for ScanPayload {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
