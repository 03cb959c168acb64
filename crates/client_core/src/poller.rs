//! Status polling loop for an initiated call.

use std::{sync::Arc, time::Duration};

use shared::protocol::{CallAnalysis, CallStatusResponse};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    insights::insights_location, session::CallSession, timer::CallTimer, CallApi, StatusSurface,
    StatusUpdate,
};

pub const TIMEOUT_MESSAGE: &str = "Call timed out. Please try again.";
pub const ANALYSIS_COMPLETE_MESSAGE: &str = "Analysis complete!";
const TRANSCRIBING_SUFFIX: &str = " (Transcribing...)";

/// Cadence and attempt budget of the poll loop. Every cycle that does not
/// end the call counts against `max_attempts`, whatever its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub error_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Analysis finished; `location` is the insights view that was opened.
    AnalysisComplete { location: String },
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub attempts: u32,
    pub session: CallSession,
    /// Set when the outcome is `AnalysisComplete`.
    pub analysis: Option<CallAnalysis>,
}

/// Turns one status response into a modal update, recording DTMF digits and
/// the live transcript on the session.
pub fn render_status(session: &mut CallSession, status: &CallStatusResponse) -> StatusUpdate {
    let message = status.status.describe();

    if let Some(digit) = &status.dtmf {
        info!(call_sid = %session.call_sid(), dtmf = %digit, "DTMF detected");
        let sequence = session.record_dtmf(digit.clone());
        StatusUpdate::message(message).with_dtmf(sequence)
    } else if let Some(transcript) = &status.transcript {
        debug!(call_sid = %session.call_sid(), "transcript updated");
        let transcript = session.replace_transcript(transcript.clone());
        StatusUpdate::message(message).with_transcript(transcript)
    } else if status.is_transcribing() {
        StatusUpdate::message(format!("{message}{TRANSCRIBING_SUFFIX}"))
    } else {
        StatusUpdate::message(message)
    }
}

pub async fn poll_call_status(
    api: Arc<dyn CallApi>,
    surface: Arc<dyn StatusSurface>,
    mut session: CallSession,
    timer: CallTimer,
    policy: PollPolicy,
    cancel: CancellationToken,
) -> PollReport {
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            info!(call_sid = %session.call_sid(), attempts, "call status polling cancelled");
            timer.stop();
            return PollReport {
                outcome: PollOutcome::Cancelled,
                attempts,
                session,
                analysis: None,
            };
        }

        if attempts >= policy.max_attempts {
            warn!(call_sid = %session.call_sid(), attempts, "call status polling timed out");
            surface.show_status(&StatusUpdate::message(TIMEOUT_MESSAGE));
            timer.stop();
            return PollReport {
                outcome: PollOutcome::TimedOut,
                attempts,
                session,
                analysis: None,
            };
        }

        debug!(
            call_sid = %session.call_sid(),
            attempt = attempts + 1,
            "polling call status"
        );

        let result = tokio::select! {
            _ = cancel.cancelled() => continue,
            result = api.call_status(session.call_sid()) => result,
        };

        let delay = match result {
            Ok(status) => {
                debug!(call_sid = %session.call_sid(), ?status, "status data");
                let update = render_status(&mut session, &status);
                surface.show_status(&update);

                if let Some(analysis) = status.completed_analysis() {
                    info!(call_sid = %session.call_sid(), "analysis complete");
                    timer.stop();
                    let mut done = StatusUpdate::message(ANALYSIS_COMPLETE_MESSAGE);
                    if let Some(transcript) = &analysis.transcript {
                        done = done.with_transcript(transcript.clone());
                    }
                    surface.show_status(&done);

                    let location = insights_location(analysis);
                    surface.navigate(&location);
                    return PollReport {
                        outcome: PollOutcome::AnalysisComplete { location },
                        attempts: attempts + 1,
                        session,
                        analysis: Some(analysis.clone()),
                    };
                }
                policy.interval
            }
            Err(err) if err.is_transient() => {
                warn!(call_sid = %session.call_sid(), error = %err, "error polling call status");
                policy.error_backoff
            }
            Err(err) => {
                error!(call_sid = %session.call_sid(), error = %err, "failed to get call status");
                policy.interval
            }
        };

        attempts += 1;
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
