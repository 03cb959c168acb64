//! UI/backend events and error modeling for the dialer GUI.

use client_core::{CallApiError, CallFlowError, PollOutcome, StatusUpdate};
use shared::domain::CallSid;

pub enum UiEvent {
    Status(StatusUpdate),
    CallStatusRevealed,
    Elapsed(String),
    /// Absolute insights URL the window should open.
    Navigate(String),
    CallStarted(CallSid),
    CallEnded {
        call_sid: CallSid,
        outcome: PollOutcome,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    Transport,
    Server,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    InitiateCall,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid")
            || message_lower.contains("please enter")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("dns")
            || message_lower.contains("unreachable")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_flow_error(err: &CallFlowError) -> Self {
        let category = match err {
            CallFlowError::Validation(_) => UiErrorCategory::Validation,
            CallFlowError::Initiation(CallApiError::Http { .. }) => UiErrorCategory::Server,
            CallFlowError::Initiation(_) => UiErrorCategory::Transport,
        };
        Self {
            category,
            context: UiErrorContext::InitiateCall,
            message: err.user_message(),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Inline text shown under the phone input.
    pub fn inline_text(&self) -> String {
        match (self.context, self.category) {
            (UiErrorContext::BackendStartup, _) => {
                format!("Dialer backend failed to start: {}", self.message)
            }
            (_, UiErrorCategory::Transport) => {
                format!("{} (check the server URL and network)", self.message)
            }
            _ => self.message.clone(),
        }
    }
}
