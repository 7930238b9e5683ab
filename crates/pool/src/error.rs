//! Pool errors

use thiserror::Error;

/// Errors surfaced by the destination pool and its ring.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A destination string did not match `ip:port` or `ip:port:instance`.
    #[error("destination {input:?} not valid, expected ip:port or ip:port:instance")]
    InvalidDestination { input: String },

    /// A destination port was not numeric.
    #[error("destination {input:?} has invalid port {port:?}")]
    InvalidPort { input: String, port: String },

    /// A ring lookup was attempted with no nodes present.
    #[error("hash ring is empty")]
    EmptyRing,

    /// An unrecognized distribution policy name.
    #[error("unknown distribution {input:?}, expected broadcast or hash-route")]
    UnknownDistribution { input: String },
}
