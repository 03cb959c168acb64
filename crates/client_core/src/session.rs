use std::time::Instant;

use shared::domain::CallSid;

/// Client-side state of one call, created when the backend accepts it.
#[derive(Debug, Clone)]
pub struct CallSession {
    call_sid: CallSid,
    started_at: Instant,
    dtmf_sequence: Vec<String>,
    transcript: Option<String>,
}

impl CallSession {
    pub fn new(call_sid: CallSid) -> Self {
        Self::started_at(call_sid, Instant::now())
    }

    pub fn started_at(call_sid: CallSid, started_at: Instant) -> Self {
        Self {
            call_sid,
            started_at,
            dtmf_sequence: Vec::new(),
            transcript: None,
        }
    }

    pub fn call_sid(&self) -> &CallSid {
        &self.call_sid
    }

    pub fn start_instant(&self) -> Instant {
        self.started_at
    }

    pub fn record_dtmf(&mut self, digits: impl Into<String>) -> &[String] {
        self.dtmf_sequence.push(digits.into());
        &self.dtmf_sequence
    }

    pub fn dtmf_sequence(&self) -> &[String] {
        &self.dtmf_sequence
    }

    /// Replaces the live transcript; fragments are not concatenated.
    pub fn replace_transcript(&mut self, transcript: impl Into<String>) -> &str {
        self.transcript.insert(transcript.into())
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }
}
