use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{CallSid, PhoneNumber},
    error::ErrorBody,
    protocol::{CallStatusQuery, CallStatusResponse, MakeCallRequest, MakeCallResponse},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod config;
pub mod error;
pub mod insights;
pub mod modal;
pub mod poller;
pub mod session;
pub mod summary;
pub mod timer;

pub use error::{CallApiError, CallFlowError};
pub use modal::{StatusModal, StatusUpdate};
pub use poller::{PollOutcome, PollPolicy, PollReport};
pub use session::CallSession;
pub use summary::{InsightsAnalyzer, InsightsSummary};
pub use timer::CallTimer;

pub const INITIATING_MESSAGE: &str = "Initiating call...";
pub const CALL_INITIATED_MESSAGE: &str = "Call initiated successfully. Waiting for connection...";

/// Backend endpoints used by the dialer.
#[async_trait]
pub trait CallApi: Send + Sync {
    async fn make_call(&self, to_number: &PhoneNumber) -> Result<CallSid, CallApiError>;
    async fn call_status(&self, call_sid: &CallSid) -> Result<CallStatusResponse, CallApiError>;
}

/// Rendering seam implemented by each front end. Calls arrive from tokio
/// tasks, so implementations must be cheap and non-blocking.
pub trait StatusSurface: Send + Sync {
    /// Opens the status modal with the given content.
    fn show_status(&self, update: &StatusUpdate);
    /// Makes the call-status container (timer label) visible.
    fn reveal_call_status(&self);
    fn update_elapsed(&self, elapsed: &str);
    /// Leaves the call view for a server-relative location.
    fn navigate(&self, location: &str);
}

pub struct HttpCallApi {
    http: Client,
    server_url: String,
}

impl HttpCallApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }
}

#[async_trait]
impl CallApi for HttpCallApi {
    async fn make_call(&self, to_number: &PhoneNumber) -> Result<CallSid, CallApiError> {
        let res = self
            .http
            .post(format!("{}/make-call", self.server_url))
            .form(&MakeCallRequest {
                to_number: to_number.to_string(),
            })
            .send()
            .await?;

        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.message().map(str::to_string));
            return Err(CallApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MakeCallResponse = serde_json::from_slice(&body)?;
        if parsed.call_sid.as_str().is_empty() {
            return Err(CallApiError::Decode("response is missing call_sid".into()));
        }
        Ok(parsed.call_sid)
    }

    async fn call_status(&self, call_sid: &CallSid) -> Result<CallStatusResponse, CallApiError> {
        let res = self
            .http
            .get(format!("{}/call-status", self.server_url))
            .query(&CallStatusQuery {
                call_sid: call_sid.clone(),
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(CallApiError::Http {
                status: status.as_u16(),
                message: (!text.is_empty()).then_some(text),
            });
        }

        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Drives one call from the phone input to the insights view.
pub struct CallController {
    api: Arc<dyn CallApi>,
    surface: Arc<dyn StatusSurface>,
    policy: PollPolicy,
}

impl CallController {
    pub fn new(api: Arc<dyn CallApi>, surface: Arc<dyn StatusSurface>, policy: PollPolicy) -> Self {
        Self {
            api,
            surface,
            policy,
        }
    }

    /// Validates the input, asks the backend to place the call and starts the
    /// elapsed-time display and status polling. Every failure is also shown
    /// on the surface before it is returned.
    pub async fn initiate_call(&self, raw_input: &str) -> Result<ActiveCall, CallFlowError> {
        let to_number = match PhoneNumber::parse(raw_input) {
            Ok(number) => number,
            Err(err) => {
                warn!(error = %err, "rejected phone number input");
                self.surface.show_status(&StatusUpdate::message(err.to_string()));
                return Err(err.into());
            }
        };

        self.surface
            .show_status(&StatusUpdate::message(INITIATING_MESSAGE));

        let call_sid = match self.api.make_call(&to_number).await {
            Ok(call_sid) => call_sid,
            Err(err) => {
                error!(error = %err, "call error");
                self.surface
                    .show_status(&StatusUpdate::message(err.initiation_message()));
                return Err(err.into());
            }
        };
        info!(call_sid = %call_sid, to_number = %to_number, "call initiated");

        self.surface.reveal_call_status();
        let session = CallSession::new(call_sid.clone());
        let cancel = CancellationToken::new();
        let timer = CallTimer::start(
            session.start_instant(),
            Arc::clone(&self.surface),
            cancel.child_token(),
        );
        self.surface
            .show_status(&StatusUpdate::message(CALL_INITIATED_MESSAGE));

        let handle = tokio::spawn(poller::poll_call_status(
            Arc::clone(&self.api),
            Arc::clone(&self.surface),
            session,
            timer,
            self.policy,
            cancel.clone(),
        ));

        Ok(ActiveCall {
            call_sid,
            cancel,
            handle,
        })
    }
}

/// Handle to a call whose status is being polled.
pub struct ActiveCall {
    call_sid: CallSid,
    cancel: CancellationToken,
    handle: JoinHandle<PollReport>,
}

impl ActiveCall {
    pub fn call_sid(&self) -> &CallSid {
        &self.call_sid
    }

    /// Stops polling and the elapsed-time display before the next cycle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> Result<PollReport> {
        self.handle
            .await
            .with_context(|| format!("status polling task for call {} failed", self.call_sid))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
