use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PhoneNumberError;

const US_COUNTRY_PREFIX: &str = "+1";
const NORMALIZED_LEN: usize = 12;

/// Opaque call identifier handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSid(pub String);

impl CallSid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips everything but digits, drops one leading country-code `1` and
/// prefixes `+1`. Performs no validation; see [`PhoneNumber::parse`].
pub fn format_phone_number(input: &str) -> String {
    let cleaned: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = cleaned.strip_prefix('1').unwrap_or(&cleaned);
    format!("{US_COUNTRY_PREFIX}{national}")
}

/// A US number in `+1XXXXXXXXXX` form. Always 12 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PhoneNumberError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let normalized = format_phone_number(raw);
        if normalized.len() != NORMALIZED_LEN {
            return Err(PhoneNumberError::InvalidLength { normalized });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
