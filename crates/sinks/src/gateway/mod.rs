//! HTTPS egress to a polymur gateway.
//!
//! The proxy's outbound path: worker tasks dequeue record batches from the
//! incoming queue, gzip them (newline after every record) and POST the
//! compressed body to the gateway's `/ingest` endpoint. The auth header is
//! attached by a pluggable [`Signer`]; the gateway is probed with `/ping`
//! at startup and a rejected key is fatal there.
//!
//! Transport errors are logged and the batch is discarded; the
//! `retry_attempts` knob re-sends a batch before giving up and defaults to
//! zero.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossfire::MAsyncRx;
use flate2::write::GzEncoder;
use flate2::Compression;
use polymur_auth::Signer;
use polymur_protocol::Batch;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Gateway egress errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// TLS material could not be loaded.
    #[error("failed to read TLS material {path}: {source}")]
    TlsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS material could not be parsed.
    #[error("invalid TLS material: {0}")]
    TlsParse(#[source] reqwest::Error),

    /// HTTP client construction failed.
    #[error("failed to build HTTPS client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request transport failure.
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway rejected the startup ping.
    #[error("gateway ping rejected ({status}): {body}")]
    Ping { status: StatusCode, body: String },

    /// Batch compression failed.
    #[error("failed to compress batch: {0}")]
    Compress(#[from] std::io::Error),
}

/// Gateway egress configuration.
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Gateway base URL, e.g. `https://gateway.example.com:443`.
    pub gateway: String,

    /// Bearer API key attached by the signer.
    pub api_key: String,

    /// Parallel writer tasks.
    pub workers: usize,

    /// Full request/response timeout.
    pub timeout: Duration,

    /// Extra root CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    /// Client certificate (PEM) for mutual TLS.
    pub client_cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS.
    pub client_key: Option<PathBuf>,

    /// Re-sends of a failed batch before it is discarded.
    pub retry_attempts: usize,

    /// Wait between re-sends.
    pub retry_interval: Duration,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            gateway: String::new(),
            api_key: String::new(),
            workers: 3,
            timeout: Duration::from_secs(30),
            ca_cert: None,
            client_cert: None,
            client_key: None,
            retry_attempts: 0,
            retry_interval: Duration::from_secs(1),
        }
    }
}

/// HTTPS writer pool posting compressed batches to a polymur gateway.
pub struct GatewayClient {
    config: GatewayClientConfig,
    client: reqwest::Client,
    signer: Arc<dyn Signer>,
}

impl GatewayClient {
    /// Build the HTTPS client, loading any configured TLS material.
    ///
    /// Unreadable or unparsable certificate files fail here, before any
    /// traffic is accepted.
    pub fn new(config: GatewayClientConfig, signer: Arc<dyn Signer>) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls();

        if let Some(path) = &config.ca_cert {
            let pem = read_pem(path)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(GatewayError::TlsParse)?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(cert_path), Some(key_path)) = (&config.client_cert, &config.client_key) {
            let mut pem = read_pem(cert_path)?;
            pem.extend(read_pem(key_path)?);
            let identity = reqwest::Identity::from_pem(&pem).map_err(GatewayError::TlsParse)?;
            builder = builder.identity(identity);
        }

        let client = builder.build().map_err(GatewayError::Client)?;

        Ok(Self {
            config,
            client,
            signer,
        })
    }

    /// Verify the API key against the gateway's `/ping` endpoint.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        tracing::info!(gateway = %self.config.gateway, "pinging gateway");
        let (status, body) = self.post("/ping", Vec::new()).await?;
        if !status.is_success() {
            return Err(GatewayError::Ping { status, body });
        }
        tracing::info!(gateway = %self.config.gateway, "gateway connection verified");
        Ok(())
    }

    /// Start the writer pool over the shared incoming queue.
    pub fn spawn_workers(
        self,
        receiver: MAsyncRx<Batch>,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let client = Arc::new(self);
        (0..client.config.workers)
            .map(|id| {
                let client = Arc::clone(&client);
                let receiver = receiver.clone();
                let cancel = cancel.clone();
                tokio::spawn(client.write_stream(id, receiver, cancel))
            })
            .collect()
    }

    /// One egress worker: dequeue, compress, post, repeat.
    async fn write_stream(
        self: Arc<Self>,
        worker_id: usize,
        receiver: MAsyncRx<Batch>,
        cancel: CancellationToken,
    ) {
        tracing::info!(worker_id, "gateway writer started");

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                received = receiver.recv() => match received {
                    Ok(batch) => batch,
                    Err(_) => break,
                },
            };

            let (body, count) = match pack_batch(&batch) {
                Ok(packed) => packed,
                Err(e) => {
                    tracing::warn!(worker_id, error = %e, "dropping uncompressible batch");
                    continue;
                }
            };

            let started = Instant::now();
            match self.send_with_retry("/ingest", body).await {
                Ok((status, response)) if status.is_success() => {
                    tracing::debug!(
                        worker_id,
                        records = count,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        response = %response.trim_end(),
                        "batch sent"
                    );
                }
                Ok((status, response)) => {
                    tracing::warn!(
                        worker_id,
                        records = count,
                        status = %status,
                        response = %response.trim_end(),
                        "gateway refused batch"
                    );
                }
                Err(e) => {
                    tracing::warn!(worker_id, records = count, error = %e, "dropping batch");
                }
            }
        }

        tracing::info!(worker_id, "gateway writer stopped");
    }

    /// Post a body, re-sending up to the configured attempt count.
    async fn send_with_retry(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> Result<(StatusCode, String), GatewayError> {
        let mut attempt = 0;
        loop {
            match self.post(path, body.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.retry_attempts => {
                    attempt += 1;
                    tracing::debug!(
                        attempt,
                        max_attempts = self.config.retry_attempts,
                        error = %e,
                        "gateway send failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<(StatusCode, String), GatewayError> {
        let url = format!("{}{}", self.config.gateway, path);
        let request = self.signer.sign(self.client.post(url), &self.config.api_key);
        let response = request.body(body).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

fn read_pem(path: &PathBuf) -> Result<Vec<u8>, GatewayError> {
    std::fs::read(path).map_err(|source| GatewayError::TlsRead {
        path: path.display().to_string(),
        source,
    })
}

/// Gzip every record in the batch, appending a newline after each.
/// Returns the compressed body and the record count.
fn pack_batch(batch: &Batch) -> std::io::Result<(Vec<u8>, usize)> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut count = 0;
    for record in batch.records() {
        encoder.write_all(record.as_str().as_bytes())?;
        encoder.write_all(b"\n")?;
        count += 1;
    }
    Ok((encoder.finish()?, count))
}
