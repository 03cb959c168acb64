//! Status surface printing modal updates to stdout.

use std::sync::{Mutex, PoisonError};

use client_core::{insights::resolve_location, StatusModal, StatusSurface, StatusUpdate};
use tracing::warn;

pub struct TerminalSurface {
    server_url: String,
    state: Mutex<TerminalState>,
}

#[derive(Default)]
struct TerminalState {
    elapsed: Option<String>,
    modal: StatusModal,
    insights_url: Option<String>,
}

impl TerminalSurface {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            state: Mutex::new(TerminalState::default()),
        }
    }

    pub fn insights_url(&self) -> Option<String> {
        self.lock().insights_url.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn render_lines(elapsed: Option<&str>, update: &StatusUpdate) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    match elapsed {
        Some(elapsed) => lines.push(format!("[{elapsed}] {}", update.message)),
        None => lines.push(update.message.clone()),
    }
    if let Some(sequence) = &update.dtmf_sequence {
        lines.push(format!("  DTMF: {}", sequence.join(" ")));
    }
    if let Some(transcript) = &update.transcript {
        lines.push(format!("  Transcript: {transcript}"));
    }
    lines
}

impl StatusSurface for TerminalSurface {
    fn show_status(&self, update: &StatusUpdate) {
        let mut state = self.lock();
        // Repeated polls often carry the same text.
        if state.modal.is_visible()
            && state.modal.message() == update.message
            && update.dtmf_sequence.is_none()
            && update.transcript.is_none()
        {
            return;
        }
        state.modal.show(update);
        for line in render_lines(state.elapsed.as_deref(), update) {
            println!("{line}");
        }
    }

    fn reveal_call_status(&self) {
        let mut state = self.lock();
        state.elapsed = Some("00:00".to_string());
        println!("Call in progress (Ctrl-C stops monitoring)");
    }

    fn update_elapsed(&self, elapsed: &str) {
        self.lock().elapsed = Some(elapsed.to_string());
    }

    fn navigate(&self, location: &str) {
        let url = match resolve_location(&self.server_url, location) {
            Ok(url) => url.to_string(),
            Err(err) => {
                warn!(error = %err, location, "could not resolve insights location");
                location.to_string()
            }
        };
        println!("Insights: {url}");
        self.lock().insights_url = Some(url);
    }
}
