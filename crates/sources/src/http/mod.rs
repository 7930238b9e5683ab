//! HTTPS gateway ingress.
//!
//! Terminates polymur-proxy connections. Two endpoints:
//!
//! - `POST /ping`: credential probe; 200 `key is valid` or 401.
//! - `POST /ingest`: gzip body of newline-delimited records. The
//!   credential is validated per request (configurable), the body is
//!   decompressed and split, and the resulting batch is handed to the
//!   incoming queue. With `key_prefix` enabled every record is prepended
//!   with `<key_name>.` before enqueue.
//!
//! A malformed gzip body is a 400; an invalid key is a 401 on the
//! offending request only, logged with the client address from
//! `X-Forwarded-For` when present.

mod handlers;

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use crossfire::MAsyncTx;
use polymur_auth::Authorizer;
use polymur_metrics::Stats;
use polymur_protocol::Batch;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Gateway ingress configuration.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Bind address.
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Prepend `<key_name>.` to every ingested record.
    pub key_prefix: bool,

    /// Validate the credential on every `/ingest` request. Disabling skips
    /// the rejection, trading strictness for less lock traffic on the hot
    /// path; the key name is still resolved when prefixing needs it.
    pub validate_on_ingest: bool,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8080,
            key_prefix: false,
            validate_on_ingest: true,
        }
    }
}

impl HttpGatewayConfig {
    /// The socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Gateway ingress counters.
#[derive(Debug, Default)]
pub struct HttpGatewayMetrics {
    /// Batches accepted on `/ingest`.
    pub batches_received: AtomicU64,

    /// Records accepted on `/ingest`.
    pub records_received: AtomicU64,

    /// Requests rejected with 401.
    pub auth_failures: AtomicU64,

    /// Bodies rejected as malformed gzip.
    pub malformed_bodies: AtomicU64,

    /// Batches dropped because the incoming queue was at capacity.
    pub batches_dropped: AtomicU64,
}

/// Gateway ingress errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpGatewayError {
    /// Failed to bind the listen address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("gateway listener failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared state behind the axum handlers.
pub(crate) struct GatewayState {
    pub(crate) config: HttpGatewayConfig,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) incoming: MAsyncTx<Batch>,
    pub(crate) stats: Arc<Stats>,
    pub(crate) metrics: Arc<HttpGatewayMetrics>,
}

/// HTTPS ingress listener for proxy traffic.
pub struct HttpGateway {
    config: HttpGatewayConfig,
    authorizer: Arc<dyn Authorizer>,
    incoming: MAsyncTx<Batch>,
    stats: Arc<Stats>,
    metrics: Arc<HttpGatewayMetrics>,
}

impl HttpGateway {
    /// Create a gateway ingress over the incoming queue.
    pub fn new(
        config: HttpGatewayConfig,
        authorizer: Arc<dyn Authorizer>,
        incoming: MAsyncTx<Batch>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            config,
            authorizer,
            incoming,
            stats,
            metrics: Arc::new(HttpGatewayMetrics::default()),
        }
    }

    /// Metrics handle; remains valid after `run` consumes the gateway.
    pub fn metrics(&self) -> Arc<HttpGatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the listener until cancellation. A bind failure is fatal.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), HttpGatewayError> {
        let bind_addr = self.config.bind_address();
        let listener =
            TcpListener::bind(&bind_addr)
                .await
                .map_err(|source| HttpGatewayError::Bind {
                    address: bind_addr.clone(),
                    source,
                })?;

        tracing::info!(address = %bind_addr, "gateway listener started");

        let state = Arc::new(GatewayState {
            config: self.config,
            authorizer: self.authorizer,
            incoming: self.incoming,
            stats: self.stats,
            metrics: self.metrics,
        });

        let app = Router::new()
            .route("/ingest", post(handlers::ingest))
            .route("/ping", post(handlers::ping))
            .with_state(state);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(HttpGatewayError::Serve)?;

        tracing::info!("gateway listener stopped");
        Ok(())
    }
}
