//! Ingress listeners.
//!
//! Both listeners feed the global incoming queue with record batches:
//!
//! - [`tcp`]: the Graphite plaintext path, newline-delimited lines over
//!   TCP, batched per connection by size or flush tick.
//! - [`http`]: the gateway path, gzip-compressed batches over HTTPS with
//!   an API-key handshake, as produced by a polymur proxy.

pub mod http;
pub mod tcp;

pub use http::{HttpGateway, HttpGatewayConfig, HttpGatewayError};
pub use tcp::{LineSource, LineSourceConfig, LineSourceError, LineSourceMetrics};
