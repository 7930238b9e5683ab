//! Admin TCP endpoint.
//!
//! A line-oriented TCP port accepting one command per connection,
//! newline-terminated and whitespace-split:
//!
//! - `getdest`: JSON object with `registered` and `active` destination
//!   name lists.
//! - `putdest <ip:port[:instance]>`: parse the destination and start a
//!   writer for it; a parse failure is reported to the caller and changes
//!   no state.
//! - `deldest <ip:port[:instance]>`: unregister the destination; under
//!   hash-route any in-flight records are pushed to the retry queue.

use std::sync::Arc;

use polymur_pool::{Destination, Pool};
use polymur_sinks::GraphiteSpawner;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Admin endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Failed to bind the admin address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// The admin TCP listener.
pub struct AdminServer {
    pool: Arc<Pool>,
    spawner: GraphiteSpawner,
    address: String,
}

impl AdminServer {
    /// Create an admin server over the shared pool. New destinations are
    /// started through the spawner so admin-created writers behave exactly
    /// like boot-time ones.
    pub fn new(pool: Arc<Pool>, spawner: GraphiteSpawner, address: impl Into<String>) -> Self {
        Self {
            pool,
            spawner,
            address: address.into(),
        }
    }

    /// Run the listener until cancellation. A bind failure is fatal.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), AdminError> {
        let listener =
            TcpListener::bind(&self.address)
                .await
                .map_err(|source| AdminError::Bind {
                    address: self.address.clone(),
                    source,
                })?;

        tracing::info!(address = %self.address, "API started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _peer)) => {
                        if let Err(e) = self.handle(stream).await {
                            tracing::warn!(error = %e, "API error");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "API error");
                    }
                },
            }
        }

        tracing::info!("API stopped");
        Ok(())
    }

    /// Read and answer one command.
    async fn handle(&self, stream: TcpStream) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();

        let mut line = String::new();
        BufReader::new(read_half).read_line(&mut line).await?;

        let mut fields = line.split_whitespace();
        let response = match fields.next() {
            Some("getdest") => self.getdest(),
            Some("putdest") => self.putdest(fields.next()),
            Some("deldest") => self.deldest(fields.next()),
            Some(other) => format!("Not a command: {other}\n"),
            None => "Not a command\n".to_string(),
        };

        write_half.write_all(response.as_bytes()).await
    }

    fn getdest(&self) -> String {
        let dests = json!({
            "registered": self.pool.registered_names(),
            "active": self.pool.active_names(),
        });
        match serde_json::to_string_pretty(&dests) {
            Ok(body) => format!("{body}\n"),
            Err(e) => format!("{e}\n"),
        }
    }

    fn putdest(&self, param: Option<&str>) -> String {
        let Some(param) = param else {
            return "Must provide destination\n".to_string();
        };
        match Destination::parse(param) {
            Ok(dest) => {
                self.spawner.spawn(dest);
                format!("Registered destination: {param}\n")
            }
            Err(e) => format!("{e}\n"),
        }
    }

    fn deldest(&self, param: Option<&str>) -> String {
        let Some(param) = param else {
            return "Must provide destination\n".to_string();
        };
        match Destination::parse(param) {
            Ok(dest) => {
                self.pool.unregister(&dest);
                format!("Unregistered destination: {param}\n")
            }
            Err(e) => format!("{e}\n"),
        }
    }
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;
