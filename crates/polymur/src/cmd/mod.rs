//! Subcommand implementations.

pub mod gateway;
pub mod proxy;
pub mod relay;

use anyhow::Result;
use futures::future::select_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wait for SIGINT or a fatal listener error, then cancel everything.
///
/// Listener tasks carry the fatal conditions (bind failures, serve
/// errors); any of them returning an error takes the process down.
/// Shutdown is deliberately non-graceful: queued records are dropped.
pub(crate) async fn run_until_shutdown(
    listeners: Vec<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
) -> Result<()> {
    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
        result = wait_for_failure(listeners) => result,
    };

    cancel.cancel();
    outcome
}

/// Resolve when any listener task finishes, propagating its result.
async fn wait_for_failure(listeners: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    if listeners.is_empty() {
        std::future::pending::<()>().await;
        return Ok(());
    }

    let (joined, _, _) = select_all(listeners).await;
    joined?
}
