//! Terminal rendering of the submission status.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use upload_ai_pipeline::Status;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Single spinner line mirroring the form's submit button.
pub struct StatusLine {
    bar: ProgressBar,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        Self { bar }
    }

    /// Render a status; terminal statuses stop the spinner.
    pub fn show(&self, status: &Status) {
        match status {
            Status::Success => self.bar.finish_with_message(status.label()),
            Status::Failed { .. } => self.bar.abandon_with_message(status.label()),
            Status::Waiting => self.bar.set_message(status.label()),
            _ => {
                self.bar.set_message(status.label());
                self.bar.enable_steady_tick(TICK_INTERVAL);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Render status changes until a terminal status arrives or the form is
/// dropped.
pub async fn follow(mut rx: broadcast::Receiver<Status>, line: StatusLine) {
    loop {
        match rx.recv().await {
            Ok(status) => {
                line.show(&status);
                if status.is_terminal() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Status renderer lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    if !line.is_finished() {
        line.bar.finish_and_clear();
    }
}
