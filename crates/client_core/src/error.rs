use shared::error::PhoneNumberError;
use thiserror::Error;

const INITIATE_FALLBACK: &str = "Failed to initiate call";

#[derive(Debug, Clone, Error)]
pub enum CallApiError {
    #[error("server returned HTTP {status}{}", http_detail(.message))]
    Http { status: u16, message: Option<String> },
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl CallApiError {
    /// Transport and decode failures are retried on the slower cadence.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    /// Text shown in the modal after a failed call initiation.
    pub fn initiation_message(&self) -> String {
        let detail = match self {
            Self::Http { message, .. } => message.as_deref().unwrap_or(INITIATE_FALLBACK),
            Self::Transport(message) | Self::Decode(message) if !message.is_empty() => {
                message.as_str()
            }
            _ => INITIATE_FALLBACK,
        };
        format!("Error: {detail}")
    }
}

fn http_detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for CallApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Http {
                status: status.as_u16(),
                message: None,
            }
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for CallApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Why a call could not be started.
#[derive(Debug, Clone, Error)]
pub enum CallFlowError {
    #[error(transparent)]
    Validation(#[from] PhoneNumberError),
    #[error("call initiation failed: {0}")]
    Initiation(#[from] CallApiError),
}

impl CallFlowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Initiation(err) => err.initiation_message(),
        }
    }
}
