//! State transitions applied to the call view for each backend event.

use client_core::{PollOutcome, StatusModal};
use shared::domain::CallSid;

use crate::controller::events::UiEvent;

#[derive(Debug, Default)]
pub struct CallViewState {
    pub modal: StatusModal,
    pub call_status_visible: bool,
    pub elapsed: String,
    pub active_call: Option<CallSid>,
    pub inline_status: Option<String>,
    pub insights_url: Option<String>,
    /// Set when the backend asks to leave for the insights view; taken by the
    /// UI on the next frame.
    pub pending_navigation: Option<String>,
}

impl CallViewState {
    pub fn call_active(&self) -> bool {
        self.active_call.is_some()
    }

    /// Clears the previous call's views once a new call has been placed.
    fn reset_for_new_call(&mut self) {
        self.modal.clear_details();
        self.call_status_visible = true;
        self.elapsed = "00:00".to_string();
        self.inline_status = None;
        self.insights_url = None;
        self.pending_navigation = None;
    }
}

pub fn apply_ui_event(state: &mut CallViewState, event: UiEvent) {
    match event {
        UiEvent::Status(update) => state.modal.show(&update),
        UiEvent::CallStatusRevealed => state.reset_for_new_call(),
        UiEvent::Elapsed(elapsed) => state.elapsed = elapsed,
        UiEvent::Navigate(url) => {
            state.insights_url = Some(url.clone());
            state.pending_navigation = Some(url);
        }
        UiEvent::CallStarted(call_sid) => {
            tracing::info!(call_sid = %call_sid, "call started");
            state.active_call = Some(call_sid);
        }
        UiEvent::CallEnded { call_sid, outcome } => {
            // A superseded call may finish after its replacement started.
            if state.active_call.as_ref() != Some(&call_sid) {
                return;
            }
            state.active_call = None;
            if outcome == PollOutcome::Cancelled {
                state.inline_status = Some("Stopped monitoring the call.".to_string());
            }
        }
        UiEvent::Error(err) => {
            tracing::warn!(
                category = ?err.category(),
                context = ?err.context(),
                "ui error: {}",
                err.message()
            );
            state.inline_status = Some(err.inline_text());
        }
    }
}
