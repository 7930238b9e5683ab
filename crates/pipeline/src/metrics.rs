//! Distributor metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the distribution hot path.
#[derive(Debug, Default)]
pub struct DistributorMetrics {
    /// Batches taken off the incoming queue.
    pub batches_received: AtomicU64,

    /// Record enqueues that landed on a destination queue.
    pub records_enqueued: AtomicU64,

    /// Records refused by a full destination queue.
    pub records_backpressured: AtomicU64,

    /// Records handed to the retry queue.
    pub records_retried: AtomicU64,

    /// Records dropped outright (empty ring, empty key, retry queue full).
    pub records_dropped: AtomicU64,
}

impl DistributorMetrics {
    /// Create a zeroed metrics instance.
    pub const fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            records_enqueued: AtomicU64::new(0),
            records_backpressured: AtomicU64::new(0),
            records_retried: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn batch_received(&self) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.records_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_backpressured(&self) {
        self.records_backpressured.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retried(&self) {
        self.records_retried.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> DistributorSnapshot {
        DistributorSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            records_backpressured: self.records_backpressured.load(Ordering::Relaxed),
            records_retried: self.records_retried.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of distributor counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributorSnapshot {
    pub batches_received: u64,
    pub records_enqueued: u64,
    pub records_backpressured: u64,
    pub records_retried: u64,
    pub records_dropped: u64,
}
