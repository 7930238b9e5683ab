//! Distribution engine: routes incoming batches onto destination queues.
//!
//! The [`Distributor`] consumes batches from the global incoming queue and
//! fans each record out according to the pool's policy: a copy to every
//! destination under broadcast, or exactly one destination chosen by the
//! consistent-hash ring under hash-route. Enqueues never block: a full
//! destination queue means the destination is back-pressured, and the
//! record is either dropped (broadcast) or pushed to the retry queue
//! (hash-route).
//!
//! The [`RetryHandler`] is the single consumer of the retry queue. It
//! coalesces reclaimed records and re-invokes the distributor, recursing
//! through the bounded retry queue when destinations are still absent.

mod distributor;
mod metrics;
mod retry;

pub use distributor::Distributor;
pub use metrics::{DistributorMetrics, DistributorSnapshot};
pub use retry::RetryHandler;
