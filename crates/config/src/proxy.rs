//! Proxy configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::LogConfig;

/// Configuration for the `polymur proxy` process.
///
/// # Example
///
/// ```toml
/// gateway = "https://gateway.example.com"
/// api_key = "3aa1b69a-3cf8-4b1d-a677-fc5e9d4ee12e"
/// workers = 3
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Metrics listener bind address.
    /// Default: "0.0.0.0"
    pub listen_address: String,

    /// Metrics listener port.
    /// Default: 2003
    pub listen_port: u16,

    /// Gateway base URL (required).
    pub gateway: String,

    /// Gateway API key.
    pub api_key: String,

    /// Signer selecting the auth header: "consul" or "api-gateway".
    /// Default: "consul"
    pub signer: String,

    /// Parallel HTTPS writers.
    /// Default: 3
    pub workers: usize,

    /// Incoming queue capacity, in batches.
    /// Default: 32768
    pub incoming_queue_cap: usize,

    /// Records per ingress batch before an early flush.
    /// Default: 5000
    pub flush_size: usize,

    /// Ingress flush tick for partial batches.
    /// Default: 15s
    #[serde(with = "humantime_serde")]
    pub flush_timeout: Duration,

    /// Full HTTPS request/response timeout.
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Re-sends of a failed batch before it is discarded.
    /// Default: 0
    pub retry_attempts: usize,

    /// Wait between re-sends.
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,

    /// Extra root CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    /// Client certificate (PEM) for mutual TLS.
    pub client_cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS.
    pub client_key: Option<PathBuf>,

    /// Dump records to stdout instead of the gateway writers.
    /// Default: false
    pub console_out: bool,

    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".into(),
            listen_port: 2003,
            gateway: String::new(),
            api_key: String::new(),
            signer: "consul".into(),
            workers: 3,
            incoming_queue_cap: 32768,
            flush_size: 5000,
            flush_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            retry_attempts: 0,
            retry_interval: Duration::from_secs(1),
            ca_cert: None,
            client_cert: None,
            client_key: None,
            console_out: false,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod proxy_test;
