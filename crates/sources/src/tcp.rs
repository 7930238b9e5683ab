//! TCP line ingress.
//!
//! Accepts Graphite plaintext connections and reads newline-delimited
//! records. Each connection hands its lines to a per-connection batcher
//! task, which emits into the global incoming queue when the batch fills
//! or when the flush ticker fires with records on hand. When the client
//! closes, the batcher flushes whatever it holds and exits.
//!
//! The handoff to the incoming queue never blocks: at saturation the batch
//! is logged and dropped rather than stalling every connection behind one
//! slow consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossfire::{MAsyncTx, TrySendError};
use polymur_metrics::Stats;
use polymur_protocol::{Batch, Record};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default records per batch before an early flush.
const DEFAULT_FLUSH_SIZE: usize = 100;

/// Default flush tick for partial batches.
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the per-connection line handoff channel.
const HANDOFF_CAPACITY: usize = 128;

/// Line ingress configuration.
#[derive(Debug, Clone)]
pub struct LineSourceConfig {
    /// Bind address.
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Records per batch before an early flush.
    pub flush_size: usize,

    /// Flush tick for partial batches.
    pub flush_timeout: Duration,
}

impl Default for LineSourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 2003,
            flush_size: DEFAULT_FLUSH_SIZE,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

impl LineSourceConfig {
    /// The socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Line ingress counters.
#[derive(Debug, Default)]
pub struct LineSourceMetrics {
    /// Connections currently open.
    pub connections_active: AtomicU64,

    /// Connections accepted over the source's lifetime.
    pub connections_total: AtomicU64,

    /// Lines received across all connections.
    pub lines_received: AtomicU64,

    /// Batches handed to the incoming queue.
    pub batches_sent: AtomicU64,

    /// Batches dropped because the incoming queue was at capacity.
    pub batches_dropped: AtomicU64,
}

impl LineSourceMetrics {
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            lines_received: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    fn line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }
}

/// Line ingress errors.
#[derive(Debug, thiserror::Error)]
pub enum LineSourceError {
    /// Failed to bind the listen address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// TCP listener feeding the incoming queue with record batches.
pub struct LineSource {
    config: LineSourceConfig,
    incoming: MAsyncTx<Batch>,
    stats: Arc<Stats>,
    metrics: Arc<LineSourceMetrics>,
}

impl LineSource {
    /// Create a line source over the incoming queue.
    pub fn new(config: LineSourceConfig, incoming: MAsyncTx<Batch>, stats: Arc<Stats>) -> Self {
        Self {
            config,
            incoming,
            stats,
            metrics: Arc::new(LineSourceMetrics::new()),
        }
    }

    /// Metrics handle; remains valid after `run` consumes the source.
    pub fn metrics(&self) -> Arc<LineSourceMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the listener until cancellation.
    ///
    /// A bind failure is returned to the caller and is fatal; transient
    /// accept errors are logged and retried.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), LineSourceError> {
        let bind_addr = self.config.bind_address();
        let listener =
            TcpListener::bind(&bind_addr)
                .await
                .map_err(|source| LineSourceError::Bind {
                    address: bind_addr.clone(),
                    source,
                })?;

        tracing::info!(address = %bind_addr, "metrics listener started");

        let source = Arc::new(self);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        source.metrics.connection_opened();
                        tokio::spawn(Arc::clone(&source).handle_connection(stream, peer));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "connection handler error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }

        tracing::info!("metrics listener stopped");
        Ok(())
    }

    /// Scan one connection's lines into the per-connection batcher.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: std::net::SocketAddr) {
        let (handoff_tx, handoff_rx) = mpsc::channel::<Record>(HANDOFF_CAPACITY);
        let batcher = tokio::spawn(Arc::clone(&self).batch_lines(handoff_rx));

        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    self.stats.incr(1);
                    self.metrics.line_received();
                    if handoff_tx.send(Record::from(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "line scan error");
                    break;
                }
            }
        }

        // Closing the handoff makes the batcher flush its remainder.
        drop(handoff_tx);
        let _ = batcher.await;

        self.metrics.connection_closed();
        tracing::debug!(peer = %peer, "connection closed");
    }

    /// Collect lines into batches, emitting on size or flush tick.
    async fn batch_lines(self: Arc<Self>, mut handoff: mpsc::Receiver<Record>) {
        let mut batch = Batch::with_capacity(self.config.flush_size);
        let mut flush = tokio::time::interval(self.config.flush_timeout);
        flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        flush.tick().await;

        loop {
            tokio::select! {
                _ = flush.tick() => {
                    if !batch.is_empty() {
                        self.emit(&mut batch);
                    }
                }
                received = handoff.recv() => {
                    let Some(record) = received else { break };
                    batch.push(record);
                    if batch.len() >= self.config.flush_size {
                        self.emit(&mut batch);
                    }
                }
            }
        }

        if !batch.is_empty() {
            self.emit(&mut batch);
        }
    }

    /// Hand a batch to the incoming queue without blocking.
    fn emit(&self, batch: &mut Batch) {
        let full = std::mem::replace(batch, Batch::with_capacity(self.config.flush_size));
        match self.incoming.try_send(full) {
            Ok(()) => {
                self.metrics.batches_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(dropped)) => {
                self.metrics.batches_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    records = dropped.len(),
                    "incoming queue at capacity, dropping batch"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("incoming queue closed");
            }
        }
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
