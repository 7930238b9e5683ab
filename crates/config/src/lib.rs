//! Process configuration.
//!
//! Each polymur process has one config struct, loadable from TOML with
//! every field defaulted, so an empty file (or none at all) yields the
//! stock deployment. Durations use humantime strings (`"5s"`, `"500ms"`).

mod gateway;
mod logging;
mod proxy;
mod relay;

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use gateway::GatewayConfig;
pub use logging::{LogConfig, LogLevel};
pub use proxy::ProxyConfig;
pub use relay::RelayConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Load any config struct from a TOML file.
pub fn from_file<C: DeserializeOwned>(path: impl AsRef<Path>) -> Result<C, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
