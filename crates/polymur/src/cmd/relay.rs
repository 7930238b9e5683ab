//! Relay command: TCP line ingress fanned out to TCP destinations.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use polymur_api::AdminServer;
use polymur_config::RelayConfig;
use polymur_metrics::{Stats, StatsTracker};
use polymur_pipeline::{Distributor, RetryHandler};
use polymur_pool::{Destination, Distribution, Pool};
use polymur_protocol::Batch;
use polymur_sinks::{ConsoleSink, GraphiteSpawner, GraphiteWriterConfig};
use polymur_sources::{LineSource, LineSourceConfig};

/// Relay command arguments.
#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-delimited list of ip:port[:instance] destinations
    #[arg(long)]
    pub destinations: Option<String>,

    /// Destination distribution method: broadcast, hash-route
    #[arg(long)]
    pub distribution: Option<String>,

    /// Dump output to console
    #[arg(long)]
    pub console_out: bool,
}

/// Run the relay.
pub async fn run(args: RelayArgs) -> Result<()> {
    let mut config: RelayConfig = match &args.config {
        Some(path) => polymur_config::from_file(path).context("failed to load configuration")?,
        None => RelayConfig::default(),
    };
    if let Some(destinations) = &args.destinations {
        config.destinations = split_destinations(destinations);
    }
    if let Some(distribution) = &args.distribution {
        config.distribution = distribution.clone();
    }
    config.console_out |= args.console_out;

    info!(version = env!("CARGO_PKG_VERSION"), "::: Polymur :::");

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

    let line_config = LineSourceConfig {
        address: config.listen_address.clone(),
        port: config.listen_port,
        flush_size: config.flush_size,
        flush_timeout: config.flush_timeout,
    };
    let line_source = LineSource::new(line_config, incoming_tx, Arc::clone(&stats));
    let line_cancel = cancel.child_token();
    listeners.push(tokio::spawn(async move {
        line_source
            .run(line_cancel)
            .await
            .context("metrics listener failed")
    }));

    super::run_until_shutdown(listeners, cancel).await
}

/// Split a comma-delimited destination list, ignoring empty entries.
pub(crate) fn split_destinations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
