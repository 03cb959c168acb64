//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{
    config::ClientSettings, insights::resolve_location, CallApi, CallController, HttpCallApi,
    StatusSurface, StatusUpdate,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::PhoneNumber;
use tokio_util::sync::CancellationToken;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Status surface forwarding every rendering request to the UI thread.
struct ChannelSurface {
    ui_tx: Sender<UiEvent>,
    server_url: String,
}

impl ChannelSurface {
    fn send(&self, event: UiEvent) {
        send_ui_event(&self.ui_tx, event);
    }
}

impl StatusSurface for ChannelSurface {
    fn show_status(&self, update: &StatusUpdate) {
        self.send(UiEvent::Status(update.clone()));
    }

    fn reveal_call_status(&self) {
        self.send(UiEvent::CallStatusRevealed);
    }

    fn update_elapsed(&self, elapsed: &str) {
        self.send(UiEvent::Elapsed(elapsed.to_string()));
    }

    fn navigate(&self, location: &str) {
        match resolve_location(&self.server_url, location) {
            Ok(url) => self.send(UiEvent::Navigate(url.to_string())),
            Err(err) => self.send(UiEvent::Error(UiError::from_message(
                UiErrorContext::General,
                format!("invalid insights location '{location}': {err}"),
            ))),
        }
    }
}

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: ClientSettings) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_backend(cmd_rx, ui_tx, settings));
    });
}

async fn run_backend(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    settings: ClientSettings,
) {
    let api: Arc<dyn CallApi> = Arc::new(HttpCallApi::new(settings.server_url.clone()));
    let surface: Arc<dyn StatusSurface> = Arc::new(ChannelSurface {
        ui_tx: ui_tx.clone(),
        server_url: settings.server_url.clone(),
    });
    let controller = CallController::new(api, surface, settings.poll_policy());
    tracing::info!(server_url = %settings.server_url, "dialer backend ready");

    let mut active_call = CallSlot::default();
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::InitiateCall { phone_input } => {
                place_call(&controller, &mut active_call, &phone_input, &ui_tx).await;
            }
            BackendCommand::CancelCall => {
                tracing::info!("backend: cancel_call");
                active_call.cancel();
            }
        }
    }

    active_call.cancel();
}

/// Cancellation handle of the call whose status is being monitored.
#[derive(Default)]
struct CallSlot {
    token: Option<CancellationToken>,
}

impl CallSlot {
    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

/// Starts a call from the phone input. Rejected input leaves the monitored
/// call untouched; an accepted number supersedes it.
async fn place_call(
    controller: &CallController,
    active_call: &mut CallSlot,
    phone_input: &str,
    ui_tx: &Sender<UiEvent>,
) {
    if PhoneNumber::parse(phone_input).is_ok() {
        active_call.cancel();
    }

    let call = match controller.initiate_call(phone_input).await {
        Ok(call) => call,
        Err(err) => {
            send_ui_event(ui_tx, UiEvent::Error(UiError::from_flow_error(&err)));
            return;
        }
    };

    active_call.token = Some(call.cancellation_token());
    send_ui_event(ui_tx, UiEvent::CallStarted(call.call_sid().clone()));

    let ui_tx = ui_tx.clone();
    let call_sid = call.call_sid().clone();
    tokio::spawn(async move {
        let event = match call.wait().await {
            Ok(report) => UiEvent::CallEnded {
                call_sid,
                outcome: report.outcome,
            },
            Err(err) => UiEvent::Error(UiError::from_message(
                UiErrorContext::General,
                err.to_string(),
            )),
        };
        send_ui_event(&ui_tx, event);
    });
}

fn send_ui_event(ui_tx: &Sender<UiEvent>, event: UiEvent) {
    if ui_tx.try_send(event).is_err() {
        tracing::warn!("ui event queue full or closed; dropping backend event");
    }
}
