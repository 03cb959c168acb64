//! Elapsed-time display for an active call.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::StatusSurface;

const TICK: Duration = Duration::from_secs(1);

/// Formats whole elapsed seconds as `MM:SS`. Minutes keep growing past 99.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Background task pushing the elapsed time to a surface once per second
/// until stopped.
pub struct CallTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CallTimer {
    pub fn start(
        started_at: Instant,
        surface: Arc<dyn StatusSurface>,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("call timer stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        surface.update_elapsed(&format_elapsed(started_at.elapsed()));
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }

    /// Stops the timer and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
