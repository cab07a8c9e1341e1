//! Terminal "thinking" indicator
//!
//! A spinner drawn on stderr while the agent waits on the model. The bar is
//! cleared when its cancellation token fires, either through
//! [`ThinkingIndicator::stop`] or because the query's token was cancelled.
//! Nothing is drawn when stderr is not a terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];
const TICK_INTERVAL: Duration = Duration::from_millis(80);

/// Handle to a running spinner.
pub struct ThinkingIndicator {
    bar: ProgressBar,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ThinkingIndicator {
    /// Starts the spinner when `enabled`.
    ///
    /// The spinner also stops when `parent` is cancelled.
    pub fn start(enabled: bool, parent: &CancellationToken) -> Self {
        let cancel = parent.child_token();
        let bar = if enabled {
            spinner("Thinking...")
        } else {
            ProgressBar::hidden()
        };

        let task = {
            let bar = bar.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                bar.finish_and_clear();
            })
        };

        Self {
            bar,
            cancel,
            task: Some(task),
        }
    }

    /// Whether a spinner is actually being drawn.
    pub fn is_active(&self) -> bool {
        !self.bar.is_hidden() && !self.bar.is_finished()
    }

    /// Stops the spinner and waits until its line is cleared.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ThinkingIndicator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_spinner()
        .tick_strings(TICK_STRINGS)
        .template("{spinner:.cyan} {msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message);
    bar.enable_steady_tick(TICK_INTERVAL);
    bar
}
