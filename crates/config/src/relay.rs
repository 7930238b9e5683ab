//! Relay configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::LogConfig;

/// Configuration for the `polymur relay` process.
///
/// # Example
///
/// ```toml
/// listen_address = "0.0.0.0"
/// listen_port = 2003
/// destinations = ["10.0.4.1:2003:a", "10.0.4.2:2003:b"]
/// distribution = "hash-route"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Metrics listener bind address.
    /// Default: "0.0.0.0"
    pub listen_address: String,

    /// Metrics listener port.
    /// Default: 2003
    pub listen_port: u16,

    /// Admin API bind address (`addr:port`).
    /// Default: "127.0.0.1:2030"
    pub api_address: String,

    /// Destinations, `ip:port` or `ip:port:instance` each.
    /// Default: empty
    pub destinations: Vec<String>,

    /// Fan-out policy: "broadcast" or "hash-route".
    /// Default: "broadcast"
    pub distribution: String,

    /// Per-destination outbound queue capacity, in records.
    /// Default: 4096
    pub outgoing_queue_cap: usize,

    /// Incoming queue capacity, in batches.
    /// Default: 32768
    pub incoming_queue_cap: usize,

    /// Records per ingress batch before an early flush.
    /// Default: 100
    pub flush_size: usize,

    /// Ingress flush tick for partial batches.
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub flush_timeout: Duration,

    /// Dump records to stdout instead of the egress engine.
    /// Default: false
    pub console_out: bool,

    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".into(),
            listen_port: 2003,
            api_address: "127.0.0.1:2030".into(),
            destinations: Vec::new(),
            distribution: "broadcast".into(),
            outgoing_queue_cap: 4096,
            incoming_queue_cap: 32768,
            flush_size: 100,
            flush_timeout: Duration::from_secs(5),
            console_out: false,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;
