//! Periodic API key refresh from an external KV store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::ApiKeys;

/// KV namespace the gateway's keys live under.
pub const KEY_PREFIX: &str = "polymur/gateway/keys/";

/// How often the local key set is refreshed.
const SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Key sync errors.
#[derive(Debug, Error)]
pub enum KeySyncError {
    /// The KV listing request failed.
    #[error("KV listing failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A KV value was not valid base64.
    #[error("KV value for {path} is not valid base64")]
    Decode { path: String },
}

/// One KV entry: the full key path and its decoded value.
///
/// The last path segment is the key name; the value is the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub path: String,
    pub value: String,
}

impl KvPair {
    /// The key name: the last segment of the path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A listable external KV store. The store is an external collaborator;
/// its listing is treated as a snapshot of current truth.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// List every `(path, value)` pair under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, KeySyncError>;
}

/// Refreshes the local key set from a [`KeyStore`] on a fixed tick.
///
/// Fetch failures are logged and the stale set keeps serving until the
/// next tick succeeds.
pub struct KeySync {
    keys: Arc<ApiKeys>,
    store: Arc<dyn KeyStore>,
    prefix: String,
    interval: Duration,
}

impl KeySync {
    /// Create a sync task over the shared key set.
    pub fn new(keys: Arc<ApiKeys>, store: Arc<dyn KeyStore>) -> Self {
        Self {
            keys,
            store,
            prefix: KEY_PREFIX.to_string(),
            interval: SYNC_INTERVAL,
        }
    }

    /// Override the refresh interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the refresh loop until cancellation.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => self.refresh().await,
            }
        }

        tracing::info!("key sync shutting down");
    }

    async fn refresh(&self) {
        tracing::debug!(prefix = %self.prefix, "running API key sync");
        match self.store.list(&self.prefix).await {
            Ok(pairs) => {
                let (added, removed) = self.keys.sync(&pairs);
                if added > 0 || removed > 0 {
                    tracing::info!(added, removed, "API keys refreshed");
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_secs = self.interval.as_secs(),
                    "key sync failed"
                );
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulKvEntry {
    key: String,
    value: Option<String>,
}

/// Consul KV backend for [`KeySync`].
pub struct ConsulStore {
    client: reqwest::Client,
    address: String,
}

impl ConsulStore {
    /// Create a store client for a Consul HTTP address, e.g.
    /// `http://127.0.0.1:8500`.
    pub fn new(address: impl Into<String>) -> Result<Self, KeySyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            address: address.into(),
        })
    }
}

#[async_trait]
impl KeyStore for ConsulStore {
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, KeySyncError> {
        let url = format!("{}/v1/kv/{}?recurse=true", self.address, prefix);
        let response = self.client.get(url).send().await?;

        // Consul answers 404 for an empty prefix.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let entries: Vec<ConsulKvEntry> = response.error_for_status()?.json().await?;
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(encoded) = entry.value else { continue };
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(&encoded)
                .map_err(|_| KeySyncError::Decode {
                    path: entry.key.clone(),
                })?;
            pairs.push(KvPair {
                path: entry.key,
                value: String::from_utf8_lossy(&decoded).into_owned(),
            });
        }
        Ok(pairs)
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;
