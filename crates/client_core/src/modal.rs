//! Status modal model shared by the front ends.

/// One rendering request for the status modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub message: String,
    pub dtmf_sequence: Option<Vec<String>>,
    pub transcript: Option<String>,
}

impl StatusUpdate {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            dtmf_sequence: None,
            transcript: None,
        }
    }

    pub fn with_dtmf(mut self, sequence: &[String]) -> Self {
        self.dtmf_sequence = Some(sequence.to_vec());
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusModal {
    visible: bool,
    message: String,
    dtmf_sequence: Vec<String>,
    transcript: Option<String>,
}

impl StatusModal {
    /// Opens the modal and applies the update. The DTMF and transcript views
    /// keep their previous content unless the update carries new values.
    pub fn show(&mut self, update: &StatusUpdate) {
        self.visible = true;
        self.message.clone_from(&update.message);
        if let Some(sequence) = &update.dtmf_sequence {
            self.dtmf_sequence.clone_from(sequence);
        }
        if let Some(transcript) = &update.transcript {
            self.transcript = Some(transcript.clone());
        }
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn reopen(&mut self) {
        self.visible = true;
    }

    /// Drops the DTMF and transcript views but keeps the current message.
    pub fn clear_details(&mut self) {
        self.dtmf_sequence.clear();
        self.transcript = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn dtmf_display(&self) -> Option<String> {
        if self.dtmf_sequence.is_empty() {
            None
        } else {
            Some(self.dtmf_sequence.join(" "))
        }
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }
}
