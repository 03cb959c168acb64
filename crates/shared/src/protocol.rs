use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::CallSid;

/// Form body of `POST /make-call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeCallRequest {
    pub to_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeCallResponse {
    pub call_sid: CallSid,
}

/// Query string of `GET /call-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatusQuery {
    pub call_sid: CallSid,
}

/// Call phase reported by the backend. Unknown values are carried through
/// verbatim so they can still be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallPhase {
    Initiated,
    Ringing,
    InProgress,
    Answered,
    Completed,
    Other(String),
}

impl CallPhase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::Answered => "answered",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }

    /// Human readable status line for the modal.
    pub fn describe(&self) -> String {
        match self {
            Self::Initiated => "Call initiated. Waiting for connection...".to_string(),
            Self::Ringing => "Call is ringing...".to_string(),
            Self::InProgress | Self::Answered => {
                "Call connected. Recording in progress...".to_string()
            }
            Self::Completed => "Call completed. Processing analysis...".to_string(),
            Self::Other(raw) => format!("Call status: {raw}"),
        }
    }
}

impl From<String> for CallPhase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "initiated" => Self::Initiated,
            "ringing" => Self::Ringing,
            "in-progress" => Self::InProgress,
            "answered" => Self::Answered,
            "completed" => Self::Completed,
            _ => Self::Other(value),
        }
    }
}

impl From<CallPhase> for String {
    fn from(value: CallPhase) -> Self {
        match value {
            CallPhase::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TranscriptionPhase {
    InProgress,
    Other(String),
}

impl From<String> for TranscriptionPhase {
    fn from(value: String) -> Self {
        if value == "in-progress" {
            Self::InProgress
        } else {
            Self::Other(value)
        }
    }
}

impl From<TranscriptionPhase> for String {
    fn from(value: TranscriptionPhase) -> Self {
        match value {
            TranscriptionPhase::InProgress => "in-progress".to_string(),
            TranscriptionPhase::Other(raw) => raw,
        }
    }
}

/// Finished call analysis. Both fields are opaque text for transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnalysis {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub transcript: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub flowchart: Option<String>,
}

/// Body of `GET /call-status`. Everything but `status` is optional and blank
/// strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatusResponse {
    pub status: CallPhase,
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub dtmf: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_status: Option<TranscriptionPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CallAnalysis>,
}

impl CallStatusResponse {
    pub fn new(status: CallPhase) -> Self {
        Self {
            status,
            dtmf: None,
            transcript: None,
            transcription_status: None,
            analysis: None,
        }
    }

    pub fn is_transcribing(&self) -> bool {
        matches!(
            self.transcription_status,
            Some(TranscriptionPhase::InProgress)
        )
    }

    /// Analysis with a final transcript, which ends the call flow.
    pub fn completed_analysis(&self) -> Option<&CallAnalysis> {
        self.analysis
            .as_ref()
            .filter(|analysis| analysis.transcript.is_some())
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}
