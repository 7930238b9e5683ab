//! Shared count/rate pair.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Process-wide received-record counter with a derived rate.
///
/// Every ingress path increments the counter once per received line; the
/// [`StatsTracker`](crate::StatsTracker) derives the rate from counter
/// deltas on its reporting tick.
#[derive(Debug, Default)]
pub struct Stats {
    count: AtomicU64,
    rate: Mutex<f64>,
}

impl Stats {
    /// A zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the received count.
    #[inline]
    pub fn incr(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Total records received.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Most recently computed receive rate, per second.
    pub fn rate(&self) -> f64 {
        *self.rate.lock()
    }

    /// Publish a newly computed rate.
    pub fn set_rate(&self, rate: f64) {
        *self.rate.lock() = rate;
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod stats_test;
