//! Polymur - fan-out relay and secure transit for Graphite line metrics.
//!
//! # Usage
//!
//! ```bash
//! # Trusted-network relay: TCP line ingress, TCP fan-out
//! polymur relay --destinations 10.0.4.1:2003,10.0.4.2:2003
//!
//! # Untrusted-boundary sender: TCP line ingress, HTTPS egress
//! polymur proxy --gateway https://gw.example.com --api-key <key>
//!
//! # Untrusted-boundary receiver: HTTPS ingress, TCP fan-out
//! polymur gateway --destinations 10.0.4.1:2003 --dev-mode
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Fan-out relay and secure transit for Graphite line metrics.
#[derive(Parser, Debug)]
#[command(name = "polymur")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trusted-network relay
    Relay(cmd::relay::RelayArgs),

    /// Run the HTTPS-egress proxy
    Proxy(cmd::proxy::ProxyArgs),

    /// Run the HTTPS-ingress gateway
    Gateway(cmd::gateway::GatewayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Relay(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            cmd::relay::run(args).await
        }
        Command::Proxy(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            cmd::proxy::run(args).await
        }
        Command::Gateway(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            cmd::gateway::run(args).await
        }
    }
}

/// Initialize the tracing subscriber.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
