//! Gateway configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::LogConfig;

/// Configuration for the `polymur gateway` process.
///
/// The gateway terminates proxy HTTPS traffic and runs the same egress
/// engine as the relay, so both listener and destination settings appear
/// here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTPS ingress bind address.
    /// Default: "0.0.0.0"
    pub listen_address: String,

    /// HTTPS ingress port.
    /// Default: 8080
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

    /// Prepend `<key_name>.` to every ingested record.
    /// Default: false
    pub key_prefix: bool,

    /// Validate the API key on every /ingest request.
    /// Default: true
    pub validate_on_ingest: bool,

    /// Dev mode: skip the KV key sync and accept the static key "123".
    /// Default: false
    pub dev_mode: bool,

    /// Consul HTTP address for API key sync.
    /// Default: "http://127.0.0.1:8500"
    pub consul_address: String,

    /// API key refresh interval.
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub key_sync_interval: Duration,

    /// Dump records to stdout instead of the egress engine.
    /// Default: false
    pub console_out: bool,

    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".into(),
            listen_port: 8080,
            api_address: "127.0.0.1:2030".into(),
            destinations: Vec::new(),
            distribution: "broadcast".into(),
            outgoing_queue_cap: 4096,
            incoming_queue_cap: 32768,
            key_prefix: false,
            validate_on_ingest: true,
            dev_mode: false,
            consul_address: "http://127.0.0.1:8500".into(),
            key_sync_interval: Duration::from_secs(30),
            console_out: false,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;
