//! Proxy command: TCP line ingress forwarded to a gateway over HTTPS.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use polymur_auth::signer_for;
use polymur_config::ProxyConfig;
use polymur_metrics::{Stats, StatsTracker};
use polymur_protocol::Batch;
use polymur_sinks::{ConsoleSink, GatewayClient, GatewayClientConfig};
use polymur_sources::{LineSource, LineSourceConfig};

/// Proxy command arguments.
#[derive(Args, Debug)]
pub struct ProxyArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Polymur gateway address
    #[arg(long)]
    pub gateway: Option<String>,

    /// Polymur gateway API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Dump output to console
    #[arg(long)]
    pub console_out: bool,
}

/// Run the proxy.
pub async fn run(args: ProxyArgs) -> Result<()> {
    let mut config: ProxyConfig = match &args.config {
        Some(path) => polymur_config::from_file(path).context("failed to load configuration")?,
        None => ProxyConfig::default(),
    };
    if let Some(gateway) = &args.gateway {
        config.gateway = gateway.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.api_key = api_key.clone();
    }
    config.console_out |= args.console_out;

    info!(version = env!("CARGO_PKG_VERSION"), "::: Polymur-proxy :::");

    let cancel = CancellationToken::new();
    let (incoming_tx, incoming_rx) =
        crossfire::mpmc::bounded_async::<Batch>(config.incoming_queue_cap);
    let stats = Arc::new(Stats::new());

    if config.console_out {
        tokio::spawn(ConsoleSink::new(incoming_rx).run(cancel.child_token()));
    } else {
        anyhow::ensure!(!config.gateway.is_empty(), "gateway address is required");

        let client_config = GatewayClientConfig {
            gateway: config.gateway.clone(),
            api_key: config.api_key.clone(),
            workers: config.workers,
            timeout: config.timeout,
            ca_cert: config.ca_cert.clone(),
            client_cert: config.client_cert.clone(),
            client_key: config.client_key.clone(),
            retry_attempts: config.retry_attempts,
            retry_interval: config.retry_interval,
        };
        let client = GatewayClient::new(client_config, signer_for(&config.signer))
            .context("failed to build gateway client")?;

        // A rejected key or unreachable gateway is fatal before any
        // traffic is accepted.
        client.ping().await.context("gateway ping failed")?;
        client.spawn_workers(incoming_rx, cancel.child_token());
    }

    tokio::spawn(StatsTracker::new(Arc::clone(&stats)).run(cancel.child_token()));

    let line_config = LineSourceConfig {
        address: config.listen_address.clone(),
        port: config.listen_port,
        flush_size: config.flush_size,
        flush_timeout: config.flush_timeout,
    };
    let line_source = LineSource::new(line_config, incoming_tx, Arc::clone(&stats));
    let line_cancel = cancel.child_token();
    let listeners: Vec<JoinHandle<Result<()>>> = vec![tokio::spawn(async move {
        line_source
            .run(line_cancel)
            .await
            .context("metrics listener failed")
    })];

    super::run_until_shutdown(listeners, cancel).await
}
