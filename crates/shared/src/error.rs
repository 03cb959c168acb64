use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection reasons for a phone number typed by the user. The `Display`
/// text is what the status modal shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneNumberError {
    #[error("Please enter a phone number")]
    Empty,
    #[error("Please enter a valid US phone number")]
    InvalidLength { normalized: String },
}

/// Error body returned by the call backend on a failed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Server-provided message, ignoring blank strings.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().filter(|m| !m.trim().is_empty())
    }
}
