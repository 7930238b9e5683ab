//! Authentication plane.
//!
//! Two independently pluggable capabilities connect the proxy and gateway:
//!
//! - the gateway-side [`Authorizer`] extracts and validates a request's
//!   credential against the process-local [`ApiKeys`] set;
//! - the proxy-side [`Signer`] attaches the credential header to outgoing
//!   requests.
//!
//! The key set itself is a local cache of remote truth: [`KeySync`]
//! refreshes it on a fixed tick from an external KV store behind the
//! [`KeyStore`] trait, so staleness is bounded by the refresh interval and
//! listing failures leave the previous set serving.

mod authorizer;
mod keys;
mod signer;
mod sync;

pub use authorizer::{Authorizer, KeyAuthorizer, KEY_HEADER};
pub use keys::ApiKeys;
pub use signer::{signer_for, ApiGatewaySigner, ConsulSigner, Signer};
pub use sync::{ConsulStore, KeyStore, KeySync, KeySyncError, KvPair, KEY_PREFIX};
