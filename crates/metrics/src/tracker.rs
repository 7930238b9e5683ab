//! Periodic stats reporter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use polymur_pool::Pool;
use tokio_util::sync::CancellationToken;

use crate::Stats;

/// Reporting cadence.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Wakes every five seconds to derive the ingest rate and survey queue
/// depths.
///
/// Destination queues at capacity are called out explicitly since further
/// records to them will be dropped; a non-empty retry queue is reported as
/// well. The pool is optional: the proxy runs the tracker with ingest
/// counters only.
pub struct StatsTracker {
    stats: Arc<Stats>,
    pool: Option<Arc<Pool>>,
    interval: Duration,
}

impl StatsTracker {
    /// A tracker over the shared ingest counter.
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            stats,
            pool: None,
            interval: REPORT_INTERVAL,
        }
    }

    /// Also survey the destination pool's queues each tick.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<Pool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Override the reporting interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the reporter until cancellation.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tick.tick().await;

        let mut last_count = self.stats.count();
        let mut last_at = Instant::now();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }

            let elapsed = last_at.elapsed().as_secs_f64();
            last_at = Instant::now();

            let count = self.stats.count();
            let delta = count.saturating_sub(last_count);
            last_count = count;

            if delta > 0 && elapsed > 0.0 {
                let rate = delta as f64 / elapsed;
                self.stats.set_rate(rate);
                tracing::info!(
                    window_secs = elapsed,
                    received = delta,
                    rate = rate,
                    "ingest rate"
                );
            } else {
                self.stats.set_rate(0.0);
            }

            let Some(pool) = &self.pool else { continue };

            for (dest, depth) in pool.queue_depths() {
                if depth == pool.queue_cap() {
                    tracing::warn!(
                        dest = %dest,
                        depth,
                        "destination queue at capacity, further records will be dropped"
                    );
                } else if depth > 0 {
                    tracing::info!(dest = %dest, depth, "destination queue depth");
                }
            }

            let retry_depth = pool.retry_depth();
            if retry_depth > 0 {
                tracing::info!(depth = retry_depth, "retry queue depth");
            }
        }
    }
}
