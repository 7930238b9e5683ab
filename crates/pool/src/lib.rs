//! Destination pool: the single routing table every component sees.
//!
//! The pool tracks which destinations the operator wants alive
//! (`registered`), which of them currently have a live connection and an
//! outbound queue (`conns`), the consistent-hash ring mirroring those
//! connections, and the shared retry queue that reclaims in-flight records
//! when a destination leaves the pool.
//!
//! Exactly one pool exists per process. It is constructed at startup and
//! handed to every component as an `Arc`; writers observe it by shared
//! reference and never own it.
//!
//! # Invariants
//!
//! - A destination may be registered without being connected; the reverse
//!   never holds (connection writers register before dialing).
//! - Removing a connection removes its ring positions in the same critical
//!   section.
//! - A destination queue has exactly one consumer: that destination's
//!   writer.

mod destination;
mod error;
mod queue;
mod ring;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use parking_lot::{RwLock, RwLockReadGuard};
use polymur_protocol::{Batch, Record};
use tokio::sync::mpsc;

pub use destination::Destination;
pub use error::PoolError;
pub use queue::{Pop, PushError, RecordQueue};
pub use ring::{HashRing, DEFAULT_VNODES};

/// Capacity of the shared retry queue, in batches.
pub const RETRY_QUEUE_CAP: usize = 4096;

/// Default capacity of each per-destination outbound queue, in records.
pub const DEFAULT_QUEUE_CAP: usize = 4096;

/// Fan-out policy, fixed at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distribution {
    /// Every record goes to every connected destination.
    Broadcast,
    /// Each record goes to the destination owning its routing key.
    HashRoute,
}

impl Distribution {
    /// The policy's configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::HashRoute => "hash-route",
        }
    }
}

impl FromStr for Distribution {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broadcast" => Ok(Self::Broadcast),
            "hash-route" => Ok(Self::HashRoute),
            other => Err(PoolError::UnknownDistribution {
                input: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct PoolState {
    registered: HashMap<String, SystemTime>,
    conns: HashMap<String, Arc<RecordQueue>>,
    ring: HashRing,
}

/// The process-wide destination pool.
pub struct Pool {
    state: RwLock<PoolState>,
    distribution: Distribution,
    queue_cap: usize,
    retry_tx: mpsc::Sender<Batch>,
    retry_depth: AtomicUsize,
    retry_dropped: AtomicU64,
}

impl Pool {
    /// Create a pool and the receiving end of its retry queue.
    ///
    /// The receiver is handed to the retry handler task; everything else
    /// interacts with the retry queue through [`Pool::retry_push`].
    pub fn new(distribution: Distribution, queue_cap: usize) -> (Self, mpsc::Receiver<Batch>) {
        Self::with_vnodes(distribution, queue_cap, DEFAULT_VNODES)
    }

    /// As [`Pool::new`] with an explicit vnode count for the ring.
    pub fn with_vnodes(
        distribution: Distribution,
        queue_cap: usize,
        vnodes: usize,
    ) -> (Self, mpsc::Receiver<Batch>) {
        let (retry_tx, retry_rx) = mpsc::channel(RETRY_QUEUE_CAP);
        let pool = Self {
            state: RwLock::new(PoolState {
                registered: HashMap::new(),
                conns: HashMap::new(),
                ring: HashRing::new(vnodes),
            }),
            distribution,
            queue_cap,
            retry_tx,
            retry_depth: AtomicUsize::new(0),
            retry_dropped: AtomicU64::new(0),
        };
        (pool, retry_rx)
    }

    /// The fan-out policy this pool distributes under.
    #[inline]
    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    /// Capacity used when creating per-destination queues.
    #[inline]
    pub fn queue_cap(&self) -> usize {
        self.queue_cap
    }

    /// Record that the operator wants this destination alive.
    ///
    /// Idempotent; refreshes the registration timestamp. Does not create a
    /// queue or ring positions.
    pub fn register(&self, dest: &Destination) {
        let mut state = self.state.write();
        state
            .registered
            .insert(dest.name().to_string(), SystemTime::now());
        tracing::info!(dest = %dest.name(), "registered destination");
    }

    /// Withdraw a destination entirely.
    ///
    /// A writer observing its own unregistration exits cleanly; its queue,
    /// if any, is reclaimed here via [`Pool::remove_conn`].
    pub fn unregister(&self, dest: &Destination) {
        {
            let mut state = self.state.write();
            state.registered.remove(dest.name());
        }
        tracing::info!(dest = %dest.name(), "unregistered destination");
        self.remove_conn(dest.name());
    }

    /// Whether a destination is currently registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.state.read().registered.contains_key(name)
    }

    /// Admit a destination to the connection pool: a fresh outbound queue
    /// plus its ring positions, in one critical section.
    ///
    /// No-op if the destination is already pooled.
    pub fn add_conn(&self, dest: &Destination) {
        let mut state = self.state.write();
        if state.conns.contains_key(dest.name()) {
            return;
        }
        state.conns.insert(
            dest.name().to_string(),
            Arc::new(RecordQueue::new(self.queue_cap)),
        );
        let keyname = dest.ring_key();
        state.ring.add_node(&keyname, dest.name());
        tracing::info!(dest = %dest.name(), "added destination to connection pool");
    }

    /// Evict a destination from the connection pool.
    ///
    /// The queue handle and ring positions are removed together under the
    /// write lock; the queue is then closed and any residual records are
    /// redistributed through the retry queue. Broadcast policy drops the
    /// residue instead: every other replica was already enqueued.
    pub fn remove_conn(&self, name: &str) {
        let queue = {
            let mut state = self.state.write();
            match state.conns.remove(name) {
                Some(queue) => {
                    state.ring.remove_node(name);
                    queue
                }
                None => return,
            }
        };

        tracing::info!(dest = %name, "removing destination from connection pool");
        queue.close();

        let residual = queue.drain();
        if residual.is_empty() || self.distribution == Distribution::Broadcast {
            return;
        }

        tracing::info!(
            dest = %name,
            records = residual.len(),
            "redistributing in-flight records"
        );
        for record in residual {
            self.retry_push(Batch::from(vec![record]));
        }
    }

    /// Whether a destination currently has an outbound queue.
    pub fn has_conn(&self, name: &str) -> bool {
        self.state.read().conns.contains_key(name)
    }

    /// The outbound queue for a destination, if pooled.
    pub fn conn(&self, name: &str) -> Option<Arc<RecordQueue>> {
        self.state.read().conns.get(name).cloned()
    }

    /// A read view over the pool, held for the duration of one batch
    /// distribution.
    pub fn view(&self) -> PoolView<'_> {
        PoolView {
            state: self.state.read(),
        }
    }

    /// Names of all registered destinations.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().registered.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of all destinations currently in the connection pool.
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().conns.keys().cloned().collect();
        names.sort();
        names
    }

    /// Depth of each destination queue, for the stats surface.
    pub fn queue_depths(&self) -> Vec<(String, usize)> {
        self.state
            .read()
            .conns
            .iter()
            .map(|(name, queue)| (name.clone(), queue.len()))
            .collect()
    }

    /// Offer a batch to the retry queue without blocking.
    ///
    /// Returns false when the retry queue is full and the batch was
    /// dropped; the bounded capacity is the back-stop against retry storms.
    pub fn retry_push(&self, batch: Batch) -> bool {
        match self.retry_tx.try_send(batch) {
            Ok(()) => {
                self.retry_depth.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.retry_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Route a single reclaimed record according to policy: through the
    /// retry queue under hash-route, dropped under broadcast.
    pub fn reclaim(&self, record: Record) {
        if self.distribution == Distribution::HashRoute {
            self.retry_push(Batch::from(vec![record]));
        }
    }

    /// Note that the retry handler took one batch off the queue.
    pub fn retry_dequeued(&self) {
        self.retry_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current retry queue depth, in batches.
    pub fn retry_depth(&self) -> usize {
        self.retry_depth.load(Ordering::Relaxed)
    }

    /// Batches dropped because the retry queue was full.
    pub fn retry_dropped(&self) -> u64 {
        self.retry_dropped.load(Ordering::Relaxed)
    }
}

/// A shared-lock view over the pool's connections and ring.
///
/// The distribution engine holds one view per incoming batch so membership
/// cannot shift mid-batch.
pub struct PoolView<'a> {
    state: RwLockReadGuard<'a, PoolState>,
}

impl PoolView<'_> {
    /// Iterate every pooled destination queue.
    pub fn queues(&self) -> impl Iterator<Item = &Arc<RecordQueue>> {
        self.state.conns.values()
    }

    /// The queue for a destination name, if pooled.
    pub fn queue(&self, name: &str) -> Option<&Arc<RecordQueue>> {
        self.state.conns.get(name)
    }

    /// Resolve a routing key through the ring.
    pub fn lookup(&self, key: &str) -> Result<&str, PoolError> {
        self.state.ring.get_node(key)
    }

    /// Whether any destination is pooled.
    pub fn is_empty(&self) -> bool {
        self.state.conns.is_empty()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
