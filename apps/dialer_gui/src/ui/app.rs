use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent,
    orchestration::dispatch_backend_command,
    reducer::{apply_ui_event, CallViewState},
};

const PHONE_HINT: &str = "(555) 123-4567";

pub struct DialerApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    server_url: String,
    phone_input: String,
    view: CallViewState,
    queue_status: String,
}

impl DialerApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        server_url: String,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            server_url,
            phone_input: String::new(),
            view: CallViewState::default(),
            queue_status: String::new(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            apply_ui_event(&mut self.view, event);
        }
    }

    fn make_call(&mut self) {
        self.queue_status.clear();
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::InitiateCall {
                phone_input: self.phone_input.clone(),
            },
            &mut self.queue_status,
        );
    }

    fn stop_monitoring(&mut self) {
        dispatch_backend_command(&self.cmd_tx, BackendCommand::CancelCall, &mut self.queue_status);
    }

    fn show_call_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("Call analysis");
        ui.label(egui::RichText::new(format!("Server: {}", self.server_url)).weak());
        ui.add_space(8.0);

        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label("Phone number");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.phone_input)
                    .hint_text(PHONE_HINT)
                    .desired_width(180.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            if ui.button("Make Call").clicked() {
                submit = true;
            }
        });
        if submit {
            self.make_call();
        }

        if let Some(status) = &self.view.inline_status {
            ui.colored_label(egui::Color32::from_rgb(220, 120, 80), status);
        }
        if !self.queue_status.is_empty() {
            ui.colored_label(egui::Color32::from_rgb(220, 80, 80), &self.queue_status);
        }
    }

    fn show_call_status(&mut self, ui: &mut egui::Ui) {
        if !self.view.call_status_visible {
            return;
        }

        ui.add_space(12.0);
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Call duration");
            ui.monospace(&self.view.elapsed);
        });

        let mut stop = false;
        let mut reopen = false;
        ui.horizontal(|ui| {
            if self.view.call_active() && ui.button("Stop monitoring").clicked() {
                stop = true;
            }
            if !self.view.modal.is_visible() && ui.button("Show status").clicked() {
                reopen = true;
            }
            if let Some(url) = &self.view.insights_url {
                if ui.button("Open insights").clicked() {
                    ui.ctx().open_url(egui::OpenUrl::new_tab(url));
                }
            }
        });
        if stop {
            self.stop_monitoring();
        }
        if reopen {
            self.view.modal.reopen();
        }
    }

    fn show_status_modal(&mut self, ctx: &egui::Context) {
        if !self.view.modal.is_visible() {
            return;
        }

        let mut open = true;
        let mut close_clicked = false;
        let modal = &self.view.modal;
        egui::Window::new("Call Status")
            .id(egui::Id::new("call_status_modal"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                ui.label(modal.message());

                if let Some(dtmf) = modal.dtmf_display() {
                    ui.separator();
                    ui.label(egui::RichText::new("DTMF sequence").strong());
                    ui.monospace(dtmf);
                }

                if let Some(transcript) = modal.transcript() {
                    ui.separator();
                    ui.label(egui::RichText::new("Live transcript").strong());
                    egui::ScrollArea::vertical()
                        .max_height(200.0)
                        .show(ui, |ui| {
                            ui.label(transcript);
                        });
                }

                ui.add_space(6.0);
                if ui.button("Close").clicked() {
                    close_clicked = true;
                }
            });

        if !open || close_clicked {
            self.view.modal.close();
        }
    }
}

impl eframe::App for DialerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        if let Some(url) = self.view.pending_navigation.take() {
            tracing::info!(%url, "opening insights");
            ctx.open_url(egui::OpenUrl::new_tab(url));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_call_form(ui);
            self.show_call_status(ui);
        });
        self.show_status_modal(ctx);

        if self.view.call_active() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}
