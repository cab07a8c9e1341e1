//! Out-of-band cancellation for interactive callers
//!
//! An interactive front end spawns one of these listeners next to
//! [`Agent::process_query`](crate::agent::Agent::process_query) so a Ctrl-C
//! cancels the in-flight query instead of killing the process.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cancels `token` on the first Ctrl-C.
///
/// The listener exits without cancelling once `token` is cancelled by
/// anything else, so it is safe to spawn one per query.
///
/// # Examples
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(agent: &mut mcpilot::Agent) -> mcpilot::Result<()> {
/// let cancel = CancellationToken::new();
/// let listener = mcpilot::agent::cancel_on_ctrl_c(&cancel);
/// let outcome = agent.process_query("list slow queries", &cancel).await;
/// listener.abort();
/// println!("{}", outcome?);
/// # Ok(())
/// # }
/// ```
pub fn cancel_on_ctrl_c(token: &CancellationToken) -> JoinHandle<()> {
    cancel_on(token, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                false
            }
        }
    })
}

/// Cancels `token` when `trigger` resolves to `true`.
pub fn cancel_on<F>(token: &CancellationToken, trigger: F) -> JoinHandle<()>
where
    F: Future<Output = bool> + Send + 'static,
{
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            fired = trigger => {
                if fired {
                    debug!("Interrupt received, cancelling query");
                    token.cancel();
                }
            }
        }
    })
}
