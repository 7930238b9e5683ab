//! Proxy-side request signing.

use std::sync::Arc;

/// Attaches the credential header to an outgoing gateway request.
///
/// A signer is a pure function over `(request, key)`; the two shipped
/// implementations differ only in which header the receiving side reads.
pub trait Signer: Send + Sync {
    /// Attach the credential to the request.
    fn sign(&self, request: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder;
}

/// Signs with `X-Polymur-Key`, validated directly by a polymur gateway.
pub struct ConsulSigner;

impl Signer for ConsulSigner {
    fn sign(&self, request: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
        request.header("X-Polymur-Key", key)
    }
}

/// Signs with `x-api-key` for an intermediary API gateway, which validates
/// the key and re-injects the polymur key toward the real gateway.
pub struct ApiGatewaySigner;

impl Signer for ApiGatewaySigner {
    fn sign(&self, request: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
        request.header("x-api-key", key)
    }
}

/// Pick a signer by configuration name; anything but `api-gateway` gets the
/// consul signer.
pub fn signer_for(name: &str) -> Arc<dyn Signer> {
    if name == "api-gateway" {
        Arc::new(ApiGatewaySigner)
    } else {
        Arc::new(ConsulSigner)
    }
}

#[cfg(test)]
#[path = "signer_test.rs"]
mod signer_test;
