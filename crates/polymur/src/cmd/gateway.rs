//! Gateway command: HTTPS ingress fanned out to TCP destinations.
//!
//! The gateway terminates proxy traffic and runs the same egress engine as
//! the relay: pool, distributor, retry handler and per-destination
//! writers.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use polymur_api::AdminServer;
use polymur_auth::{ApiKeys, ConsulStore, KeyAuthorizer, KeySync};
use polymur_config::GatewayConfig;
use polymur_metrics::{Stats, StatsTracker};
use polymur_pipeline::{Distributor, RetryHandler};
use polymur_pool::{Destination, Distribution, Pool};
use polymur_protocol::Batch;
use polymur_sinks::{ConsoleSink, GraphiteSpawner, GraphiteWriterConfig};
use polymur_sources::{HttpGateway, HttpGatewayConfig};

use super::relay::split_destinations;

/// Gateway command arguments.
#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-delimited list of ip:port[:instance] destinations
    #[arg(long)]
    pub destinations: Option<String>,

    /// Destination distribution method: broadcast, hash-route
    #[arg(long)]
    pub distribution: Option<String>,

    /// Dev mode: disables the KV key store; accepts key '123'
    #[arg(long)]
    pub dev_mode: bool,

    /// Prepend all metrics with the origin proxy API key's name
    #[arg(long)]
    pub key_prefix: bool,

    /// Dump output to console
    #[arg(long)]
    pub console_out: bool,
}

/// Run the gateway.
pub async fn run(args: GatewayArgs) -> Result<()> {
    let mut config: GatewayConfig = match &args.config {
        Some(path) => polymur_config::from_file(path).context("failed to load configuration")?,
        None => GatewayConfig::default(),
    };
    if let Some(destinations) = &args.destinations {
        config.destinations = split_destinations(destinations);
    }
    if let Some(distribution) = &args.distribution {
        config.distribution = distribution.clone();
    }
    config.dev_mode |= args.dev_mode;
    config.key_prefix |= args.key_prefix;
    config.console_out |= args.console_out;

    info!(version = env!("CARGO_PKG_VERSION"), "::: Polymur-gateway :::");

    let cancel = CancellationToken::new();
    let (incoming_tx, incoming_rx) =
        crossfire::mpmc::bounded_async::<Batch>(config.incoming_queue_cap);
    let stats = Arc::new(Stats::new());

    let mut listeners: Vec<JoinHandle<Result<()>>> = Vec::new();

    if config.console_out {
        tokio::spawn(ConsoleSink::new(incoming_rx).run(cancel.child_token()));
        tokio::spawn(StatsTracker::new(Arc::clone(&stats)).run(cancel.child_token()));
    } else {
        let distribution = Distribution::from_str(&config.distribution)
            .context("invalid distribution method")?;
        let (pool, retry_rx) = Pool::new(distribution, config.outgoing_queue_cap);
        let pool = Arc::new(pool);

        let distributor = Distributor::new(Arc::clone(&pool));
        tokio::spawn(
            RetryHandler::new(distributor.clone(), Arc::clone(&pool), retry_rx)
                .run(cancel.child_token()),
        );
        tokio::spawn(distributor.clone().run(incoming_rx, cancel.child_token()));

        let spawner = GraphiteSpawner::new(
            Arc::clone(&pool),
            GraphiteWriterConfig::default(),
            cancel.clone(),
        );
        for raw in &config.destinations {
            match Destination::parse(raw) {
                Ok(dest) => spawner.spawn(dest),
                Err(e) => warn!(error = %e, "skipping destination"),
            }
        }

        tokio::spawn(
            StatsTracker::new(Arc::clone(&stats))
                .with_pool(Arc::clone(&pool))
                .run(cancel.child_token()),
        );

        let admin = AdminServer::new(Arc::clone(&pool), spawner, config.api_address.clone());
        let admin_cancel = cancel.child_token();
        listeners.push(tokio::spawn(async move {
            admin.run(admin_cancel).await.context("admin API failed")
        }));
    }

    // API key plane: static dev key or periodic KV sync.
    let keys = Arc::new(ApiKeys::new());
    if config.dev_mode {
        keys.install_dev_key();
    } else {
        let store = ConsulStore::new(config.consul_address.clone())
            .context("failed to build Consul client")?;
        tokio::spawn(
            KeySync::new(Arc::clone(&keys), Arc::new(store))
                .with_interval(config.key_sync_interval)
                .run(cancel.child_token()),
        );
    }

    let http_config = HttpGatewayConfig {
        address: config.listen_address.clone(),
        port: config.listen_port,
        key_prefix: config.key_prefix,
        validate_on_ingest: config.validate_on_ingest,
    };
    let http_gateway = HttpGateway::new(
        http_config,
        Arc::new(KeyAuthorizer::new(keys)),
        incoming_tx,
        Arc::clone(&stats),
    );
    let http_cancel = cancel.child_token();
    listeners.push(tokio::spawn(async move {
        http_gateway
            .run(http_cancel)
            .await
            .context("gateway listener failed")
    }));

    super::run_until_shutdown(listeners, cancel).await
}
