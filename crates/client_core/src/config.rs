use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::poller::PollPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "dialer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub max_poll_attempts: u32,
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            poll_interval_ms: 1_000,
            error_backoff_ms: 5_000,
            max_poll_attempts: 60,
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    poll_interval_ms: Option<u64>,
    error_backoff_ms: Option<u64>,
    max_poll_attempts: Option<u32>,
    log_level: Option<String>,
}

impl ClientSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.server_url {
            self.server_url = v;
        }
        if let Some(v) = file_cfg.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file_cfg.error_backoff_ms {
            self.error_backoff_ms = v;
        }
        if let Some(v) = file_cfg.max_poll_attempts {
            self.max_poll_attempts = v;
        }
        if let Some(v) = file_cfg.log_level {
            self.log_level = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DIALER_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = var("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(parsed) = var("APP__POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = parsed;
        }
        if let Some(parsed) = var("APP__ERROR_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            self.error_backoff_ms = parsed;
        }
        if let Some(parsed) = var("APP__MAX_POLL_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.max_poll_attempts = parsed;
        }

        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = v.to_ascii_lowercase();
        }
    }
}

/// Defaults, then `dialer.toml` (or `path`), then environment overrides.
/// A missing file is not an error; a malformed one is.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    load_settings_with_env(path, |key| std::env::var(key).ok())
}

fn load_settings_with_env(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = parse_file_settings(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(var);
    Ok(settings)
}

fn parse_file_settings(raw: &str) -> anyhow::Result<FileSettings> {
    Ok(toml::from_str(raw)?)
}
