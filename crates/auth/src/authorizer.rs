//! Gateway-side credential validation.

use std::sync::Arc;

use http::HeaderMap;

use crate::ApiKeys;

/// Header carrying the polymur API key.
pub const KEY_HEADER: &str = "x-polymur-key";

/// Extracts and validates a request's credential.
///
/// `credential` is used only for logging rejected requests; `validate`
/// returns the key's name when the credential is accepted.
pub trait Authorizer: Send + Sync {
    /// The raw credential presented by the request, if any.
    fn credential(&self, headers: &HeaderMap) -> Option<String>;

    /// Validate the request's credential, returning the key name on
    /// success.
    fn validate(&self, headers: &HeaderMap) -> Option<String>;
}

/// Validates the `X-Polymur-Key` header against the local key set.
pub struct KeyAuthorizer {
    keys: Arc<ApiKeys>,
}

impl KeyAuthorizer {
    /// Create an authorizer over the shared key set.
    pub fn new(keys: Arc<ApiKeys>) -> Self {
        Self { keys }
    }
}

impl Authorizer for KeyAuthorizer {
    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn validate(&self, headers: &HeaderMap) -> Option<String> {
        let key = self.credential(headers)?;
        self.keys.name_for_key(&key)
    }
}

#[cfg(test)]
#[path = "authorizer_test.rs"]
mod authorizer_test;
