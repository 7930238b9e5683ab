//! Egress writers.
//!
//! Three ways out of a polymur process:
//!
//! - [`graphite`]: one TCP writer per destination, draining that
//!   destination's outbound queue from the pool and carrying the
//!   connect/retry/eviction state machine.
//! - [`gateway`]: a worker pool that gzips record batches and POSTs them to
//!   a polymur gateway over HTTPS with an API-key handshake.
//! - [`console`]: a stdout dump for debugging.

pub mod console;
pub mod gateway;
pub mod graphite;

pub use console::ConsoleSink;
pub use gateway::{GatewayClient, GatewayClientConfig, GatewayError};
pub use graphite::{GraphiteSpawner, GraphiteWriter, GraphiteWriterConfig, GraphiteWriterMetrics};
