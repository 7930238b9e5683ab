//! Retry queue drain task.

use std::sync::Arc;
use std::time::Duration;

use polymur_pool::Pool;
use polymur_protocol::{Batch, Record};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Distributor;

/// Records coalesced before a retry dispatch.
const RETRY_BATCH_SIZE: usize = 30;

/// How often a partial retry batch is flushed regardless of size.
const RETRY_FLUSH_INTERVAL: Duration = Duration::from_secs(15);

/// Delay applied before every retry dispatch, taming the loop when no
/// destinations are available.
const RETRY_DISPATCH_DELAY: Duration = Duration::from_millis(500);

/// The single long-running consumer of the pool's retry queue.
///
/// Reclaimed records are coalesced up to [`RETRY_BATCH_SIZE`] or flushed on
/// the 15 s tick, then re-dispatched through the configured distribution
/// function. A re-dispatch that fails again recurses through the retry
/// queue; its bounded capacity is the back-stop.
pub struct RetryHandler {
    distributor: Distributor,
    pool: Arc<Pool>,
    receiver: mpsc::Receiver<Batch>,
}

impl RetryHandler {
    /// Create the handler from the distributor and the retry receiver
    /// produced by [`Pool::new`].
    pub fn new(distributor: Distributor, pool: Arc<Pool>, receiver: mpsc::Receiver<Batch>) -> Self {
        Self {
            distributor,
            pool,
            receiver,
        }
    }

    /// Drain the retry queue until cancellation.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut pending: Vec<Record> = Vec::new();
        let mut flush = tokio::time::interval(RETRY_FLUSH_INTERVAL);
        flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        flush.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        self.dispatch(&mut pending).await;
                    }
                }
                received = self.receiver.recv() => {
                    let Some(batch) = received else { break };
                    self.pool.retry_dequeued();
                    pending.extend(batch.into_records());
                    if pending.len() >= RETRY_BATCH_SIZE {
                        self.dispatch(&mut pending).await;
                    }
                }
            }
        }

        tracing::info!("retry handler shutting down");
    }

    async fn dispatch(&self, pending: &mut Vec<Record>) {
        tokio::time::sleep(RETRY_DISPATCH_DELAY).await;
        let batch = Batch::from(std::mem::take(pending));
        tracing::debug!(records = batch.len(), "retrying distribution");
        self.distributor.dispatch(&batch);
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;
