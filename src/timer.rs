//! Session timer: elapsed-time tracking and 1 Hz tick events.

use crate::events::GameEvent;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Emits [`GameEvent::TimeTick`] once per second while a session runs.
///
/// At most one tick task is live: starting again stops the previous one
/// first, so a restart never produces duplicate tick streams.
#[derive(Debug)]
pub struct TimerController {
    handle: Option<tokio::task::JoinHandle<()>>,
    started_at: Option<Instant>,
}

impl TimerController {
    /// Creates a stopped timer.
    pub fn new() -> Self {
        Self {
            handle: None,
            started_at: None,
        }
    }

    /// Starts (or restarts) the tick stream.
    #[instrument(skip_all)]
    pub fn start(&mut self, events: mpsc::UnboundedSender<GameEvent>) {
        self.stop();
        let started_at = Instant::now();
        self.started_at = Some(started_at);
        debug!("timer started");
        self.handle = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(Duration::from_secs(1));
            // interval fires immediately; the first tick should land at 1s
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if events
                    .send(GameEvent::TimeTick(started_at.elapsed()))
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// Halts the tick stream. Elapsed time remains readable.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("timer stopped");
        }
    }

    /// Whether a tick task is currently live.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Time since the last start, or zero if never started.
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default()
    }
}

impl Default for TimerController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Formats an elapsed duration as `MM:SS` for display.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
