//! Per-batch fan-out.

use std::sync::Arc;

use crossfire::MAsyncRx;
use polymur_pool::{Distribution, Pool};
use polymur_protocol::Batch;
use tokio_util::sync::CancellationToken;

use crate::metrics::DistributorMetrics;

/// Routes batches onto destination queues under the pool's policy.
///
/// One `dispatch` call holds a shared lock on the pool for the duration of
/// a single batch, so destination membership cannot shift mid-batch. All
/// enqueues are non-blocking; the distributor never suspends on a
/// destination queue.
#[derive(Clone)]
pub struct Distributor {
    pool: Arc<Pool>,
    metrics: Arc<DistributorMetrics>,
}

impl Distributor {
    /// Create a distributor over the shared pool.
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool,
            metrics: Arc::new(DistributorMetrics::new()),
        }
    }

    /// The shared pool this distributor routes into.
    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    /// Metrics for this distributor; the handle stays valid after `run`
    /// consumes the receiver.
    pub fn metrics(&self) -> &Arc<DistributorMetrics> {
        &self.metrics
    }

    /// Fan one batch out according to the configured policy.
    pub fn dispatch(&self, batch: &Batch) {
        self.metrics.batch_received();
        match self.pool.distribution() {
            Distribution::Broadcast => self.broadcast(batch),
            Distribution::HashRoute => self.hash_route(batch),
        }
    }

    /// Enqueue a copy of each record into every available destination
    /// queue. A full queue skips that destination; broadcasting never
    /// retries.
    fn broadcast(&self, batch: &Batch) {
        let view = self.pool.view();
        for record in batch.records() {
            for queue in view.queues() {
                match queue.try_push(record.clone()) {
                    Ok(()) => self.metrics.record_enqueued(),
                    Err(_) => self.metrics.record_backpressured(),
                }
            }
        }
    }

    /// Enqueue each record into the destination owning its routing key.
    ///
    /// Lookup failures on an empty ring drop the record: the retry path
    /// would only spin it back here. A refused enqueue pushes the record as
    /// a singleton batch onto the retry queue; a full retry queue drops it.
    fn hash_route(&self, batch: &Batch) {
        let view = self.pool.view();
        for record in batch.records() {
            let Some(key) = record.routing_key() else {
                self.metrics.record_dropped();
                continue;
            };

            let Ok(name) = view.lookup(key) else {
                self.metrics.record_dropped();
                continue;
            };

            let delivered = match view.queue(name) {
                Some(queue) => queue.try_push(record.clone()).is_ok(),
                None => false,
            };

            if delivered {
                self.metrics.record_enqueued();
                continue;
            }

            self.metrics.record_backpressured();
            if self.pool.retry_push(Batch::from(vec![record.clone()])) {
                self.metrics.record_retried();
            } else {
                self.metrics.record_dropped();
            }
        }
    }

    /// Consume the incoming queue until cancellation or channel close,
    /// dispatching every batch.
    pub async fn run(self, receiver: MAsyncRx<Batch>, cancel: CancellationToken) {
        tracing::info!(
            distribution = %self.pool.distribution(),
            "distributor starting"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = receiver.recv() => match received {
                    Ok(batch) => self.dispatch(&batch),
                    Err(_) => break,
                },
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            batches_received = snapshot.batches_received,
            records_enqueued = snapshot.records_enqueued,
            records_backpressured = snapshot.records_backpressured,
            records_retried = snapshot.records_retried,
            records_dropped = snapshot.records_dropped,
            "distributor shutting down"
        );
    }
}

#[cfg(test)]
#[path = "distributor_test.rs"]
mod distributor_test;
