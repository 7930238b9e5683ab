//! Gateway route handlers.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use crossfire::TrySendError;
use flate2::read::GzDecoder;
use polymur_protocol::{Batch, Record};

use super::GatewayState;

/// POST /ping: credential probe.
pub(crate) async fn ping(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let client = client_addr(&headers, addr);

    match state.authorizer.validate(&headers) {
        Some(name) => {
            tracing::info!(client = %client, key_name = %name, "key is valid");
            (StatusCode::OK, "key is valid\n").into_response()
        }
        None => {
            state.metrics.auth_failures.fetch_add(1, Ordering::Relaxed);
            let rejected = state.authorizer.credential(&headers).unwrap_or_default();
            tracing::warn!(client = %client, key = %rejected, "not a valid key");
            (StatusCode::UNAUTHORIZED, "invalid key").into_response()
        }
    }
}

/// POST /ingest: one compressed record batch.
pub(crate) async fn ingest(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_addr(&headers, addr);

    let key_name = state.authorizer.validate(&headers);
    if state.config.validate_on_ingest && key_name.is_none() {
        state.metrics.auth_failures.fetch_add(1, Ordering::Relaxed);
        let rejected = state.authorizer.credential(&headers).unwrap_or_default();
        tracing::warn!(client = %client, key = %rejected, "not a valid key");
        return (StatusCode::UNAUTHORIZED, "invalid key").into_response();
    }

    let mut decompressed = Vec::new();
    if let Err(e) = GzDecoder::new(&body[..]).read_to_end(&mut decompressed) {
        state
            .metrics
            .malformed_bodies
            .fetch_add(1, Ordering::Relaxed);
        tracing::warn!(client = %client, error = %e, "malformed gzip body");
        return (StatusCode::BAD_REQUEST, "malformed gzip body").into_response();
    }

    let prefix = if state.config.key_prefix {
        key_name.as_deref()
    } else {
        None
    };

    let mut batch = Batch::new();
    for line in decompressed.split(|b| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let line = String::from_utf8_lossy(line);
        let record = match prefix {
            Some(name) => Record::from(format!("{name}.{line}")),
            None => Record::from(line.into_owned()),
        };
        batch.push(record);
        state.stats.incr(1);
    }

    let count = batch.len();
    match state.incoming.try_send(batch) {
        Ok(()) => {
            state
                .metrics
                .batches_received
                .fetch_add(1, Ordering::Relaxed);
            state
                .metrics
                .records_received
                .fetch_add(count as u64, Ordering::Relaxed);
        }
        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
            state.metrics.batches_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                client = %client,
                records = count,
                "incoming queue at capacity, dropping batch"
            );
        }
    }

    tracing::info!(
        client = %client,
        key_name = %key_name.as_deref().unwrap_or("unknown"),
        records = count,
        "received batch"
    );

    (StatusCode::OK, "Batch Received\n").into_response()
}

/// The client address for logging, honoring `X-Forwarded-For`.
fn client_addr(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| addr.to_string())
}
