//! Per-destination Graphite plaintext writer.
//!
//! One writer task runs for every destination until the destination is
//! unregistered. The writer owns the only consuming end of its
//! destination's outbound queue and carries the full connection lifecycle:
//!
//! - dial with a short timeout, retrying on a fixed cadence
//! - after `retry_max` consecutive dial failures while the destination is
//!   in the connection pool, evict it (the destination stays registered and
//!   rejoins the pool on the next successful dial)
//! - poll the queue without blocking, backing off exponentially while it is
//!   empty so unregistration is still observed
//! - on a failed send, reclaim the record at the head of its own queue and
//!   reconnect
//!
//! Blocking on the queue would prevent the writer from observing
//! unregistration while the queue is empty; the explicit backoff loop
//! releases the pool lock between polls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use polymur_pool::{Destination, Pool, Pop};
use polymur_protocol::Record;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Dial timeout applied to every connection attempt.
const DIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause between failed connection attempts.
const REDIAL_INTERVAL: Duration = Duration::from_secs(10);

/// Consecutive dial failures tolerated before pool eviction.
const RETRY_MAX: usize = 3;

/// Starting sleep when the outbound queue reads empty.
const BACKOFF_FLOOR: Duration = Duration::from_millis(1);

/// Ceiling for the empty-queue backoff.
const BACKOFF_CEILING: Duration = Duration::from_millis(1024);

/// Connection writer tunables.
#[derive(Debug, Clone)]
pub struct GraphiteWriterConfig {
    /// Timeout for each dial attempt.
    pub dial_timeout: Duration,

    /// Wait between failed dial attempts.
    pub redial_interval: Duration,

    /// Consecutive dial failures before the destination is evicted from
    /// the connection pool.
    pub retry_max: usize,

    /// Initial empty-queue poll backoff.
    pub backoff_floor: Duration,

    /// Maximum empty-queue poll backoff.
    pub backoff_ceiling: Duration,

    /// Enable TCP keepalive on destination connections.
    pub keepalive: bool,

    /// Disable Nagle's algorithm on destination connections.
    pub nodelay: bool,
}

impl Default for GraphiteWriterConfig {
    fn default() -> Self {
        Self {
            dial_timeout: DIAL_TIMEOUT,
            redial_interval: REDIAL_INTERVAL,
            retry_max: RETRY_MAX,
            backoff_floor: BACKOFF_FLOOR,
            backoff_ceiling: BACKOFF_CEILING,
            keepalive: true,
            nodelay: true,
        }
    }
}

/// Writer counters.
#[derive(Debug, Default)]
pub struct GraphiteWriterMetrics {
    /// Records written to the destination.
    pub records_sent: AtomicU64,

    /// Bytes written, including newline delimiters.
    pub bytes_sent: AtomicU64,

    /// Failed record sends.
    pub write_errors: AtomicU64,

    /// Successful dials, initial connection included.
    pub connects: AtomicU64,

    /// Pool evictions after consecutive dial failures.
    pub evictions: AtomicU64,
}

impl GraphiteWriterMetrics {
    pub const fn new() -> Self {
        Self {
            records_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_sent(&self, bytes: u64) {
        self.records_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}

/// A connection writer bound to one destination.
pub struct GraphiteWriter {
    pool: Arc<Pool>,
    dest: Destination,
    config: GraphiteWriterConfig,
    metrics: Arc<GraphiteWriterMetrics>,
}

impl GraphiteWriter {
    /// Create a writer with default tunables.
    pub fn new(pool: Arc<Pool>, dest: Destination) -> Self {
        Self::with_config(pool, dest, GraphiteWriterConfig::default())
    }

    /// Create a writer with explicit tunables.
    pub fn with_config(pool: Arc<Pool>, dest: Destination, config: GraphiteWriterConfig) -> Self {
        Self {
            pool,
            dest,
            config,
            metrics: Arc::new(GraphiteWriterMetrics::new()),
        }
    }

    /// Metrics handle; remains valid after `run` consumes the writer.
    pub fn metrics(&self) -> Arc<GraphiteWriterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the writer until the destination is unregistered or the token
    /// is cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        self.pool.register(&self.dest);

        let Some(mut stream) = self.establish(&cancel).await else {
            tracing::info!(dest = %self.dest.name(), "writer exiting");
            return;
        };

        let mut backoff = self.config.backoff_floor;

        loop {
            if cancel.is_cancelled() {
                return;
            }

            let popped = match self.pool.conn(self.dest.name()) {
                Some(queue) => queue.try_pop(),
                None => Pop::Closed,
            };

            match popped {
                Pop::Closed => {
                    tracing::info!(dest = %self.dest.name(), "writer exiting");
                    return;
                }
                Pop::Empty => {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.config.backoff_ceiling);
                }
                Pop::Record(record) => {
                    backoff = self.config.backoff_floor;
                    match write_record(&mut stream, record.as_str()).await {
                        Ok(bytes) => self.metrics.record_sent(bytes),
                        Err(e) => {
                            tracing::warn!(
                                dest = %self.dest.name(),
                                error = %e,
                                "send failed, reconnecting"
                            );
                            self.metrics.write_error();
                            self.reclaim(record);
                            match self.establish(&cancel).await {
                                Some(new_stream) => stream = new_stream,
                                None => {
                                    tracing::info!(dest = %self.dest.name(), "writer exiting");
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Put a record that failed to send back at the head of its own queue.
    ///
    /// If the queue closed in the meantime the record is rerouted the same
    /// way RemoveConn reroutes residue: via the retry queue under
    /// hash-route, dropped under broadcast.
    fn reclaim(&self, record: Record) {
        let rejected = match self.pool.conn(self.dest.name()) {
            Some(queue) => match queue.requeue_front(record) {
                Ok(()) => return,
                Err(record) => record,
            },
            None => record,
        };
        self.pool.reclaim(rejected);
    }

    /// Dial until connected, the destination is unregistered, or the token
    /// is cancelled.
    ///
    /// A destination that was in the pool is evicted after
    /// `retry_max` consecutive failures; dialing continues at the same
    /// cadence afterwards so the destination can rejoin on success.
    async fn establish(&self, cancel: &CancellationToken) -> Option<TcpStream> {
        let name = self.dest.name();
        let addr = self.dest.addr();
        let mut failures = 0usize;

        loop {
            if cancel.is_cancelled() {
                return None;
            }

            if !self.pool.is_registered(name) {
                tracing::debug!(dest = %name, "destination no longer registered");
                return None;
            }

            let pooled = self.pool.has_conn(name);
            if failures >= self.config.retry_max && pooled {
                tracing::warn!(
                    dest = %name,
                    retries = self.config.retry_max,
                    "exceeded retry count, evicting from connection pool"
                );
                self.metrics.eviction();
                self.pool.remove_conn(name);
            }

            match timeout(self.config.dial_timeout, TcpStream::connect(addr.as_str())).await {
                Ok(Ok(stream)) => {
                    self.configure_socket(&stream);
                    if self.pool.has_conn(name) {
                        tracing::info!(dest = %name, "reconnected to destination");
                    } else {
                        self.pool.add_conn(&self.dest);
                    }
                    self.metrics.connect();
                    return Some(stream);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        dest = %name,
                        error = %e,
                        retry_secs = self.config.redial_interval.as_secs(),
                        "destination dial failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        dest = %name,
                        timeout_secs = self.config.dial_timeout.as_secs(),
                        "destination dial timed out"
                    );
                }
            }

            failures += 1;
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.config.redial_interval) => {}
            }
        }
    }

    /// Socket options are best effort; a destination that rejects them
    /// still gets traffic.
    fn configure_socket(&self, stream: &TcpStream) {
        if self.config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(dest = %self.dest.name(), error = %e, "failed to set TCP_NODELAY");
            }
        }

        if self.config.keepalive {
            let sock_ref = SockRef::from(stream);
            let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(30));
            if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(dest = %self.dest.name(), error = %e, "failed to set TCP keepalive");
            }
        }
    }
}

/// Write one record followed by a newline; returns bytes written.
async fn write_record(stream: &mut TcpStream, line: &str) -> std::io::Result<u64> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    Ok(line.len() as u64 + 1)
}

/// A cloneable handle for starting destination writers.
///
/// The egress bootstrap and the admin interface both start writers; neither
/// owns the pool or the writer tasks, so they share this handle instead.
#[derive(Clone)]
pub struct GraphiteSpawner {
    pool: Arc<Pool>,
    config: GraphiteWriterConfig,
    cancel: CancellationToken,
}

impl GraphiteSpawner {
    /// Create a spawner over the shared pool.
    pub fn new(pool: Arc<Pool>, config: GraphiteWriterConfig, cancel: CancellationToken) -> Self {
        Self {
            pool,
            config,
            cancel,
        }
    }

    /// Start a writer task for a destination.
    pub fn spawn(&self, dest: Destination) {
        let writer = GraphiteWriter::with_config(
            Arc::clone(&self.pool),
            dest,
            self.config.clone(),
        );
        tokio::spawn(writer.run(self.cancel.child_token()));
    }
}
