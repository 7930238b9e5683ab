//! Destination endpoints.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::PoolError;

/// A downstream relay endpoint.
///
/// Parsed from `"ip:port"` or `"ip:port:instance"`. The `name` is the exact
/// textual form the operator supplied and is the identity used everywhere in
/// the pool: two destinations are equal iff their names are equal. The
/// optional instance participates only in ring key construction, mirroring
/// carbon-cache's `(ip, instance)` node tuples.
#[derive(Clone, Debug)]
pub struct Destination {
    ip: String,
    port: u16,
    instance: Option<String>,
    name: String,
}

impl Destination {
    /// Parse a destination from its textual form.
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        let parts: Vec<&str> = s.split(':').collect();
        let (ip, port, instance) = match parts.as_slice() {
            [ip, port] => (*ip, *port, None),
            [ip, port, instance] => (*ip, *port, Some((*instance).to_string())),
            _ => {
                return Err(PoolError::InvalidDestination {
                    input: s.to_string(),
                })
            }
        };

        if ip.is_empty() {
            return Err(PoolError::InvalidDestination {
                input: s.to_string(),
            });
        }

        let port: u16 = port.parse().map_err(|_| PoolError::InvalidPort {
            input: s.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self {
            ip: ip.to_string(),
            port,
            instance,
            name: s.to_string(),
        })
    }

    /// The exact textual form the destination was parsed from.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The destination IP (or hostname) component.
    #[inline]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// The destination port.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The optional instance identifier.
    #[inline]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// The dialable `ip:port` address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// The ring key for this destination.
    ///
    /// Replicates the destination key setup in the carbon-cache
    /// implementation: a string composed of the (IP, instance) tuple with
    /// literal parentheses and quotes, e.g. `('127.0.0.1', 'a')`.
    pub fn ring_key(&self) -> String {
        format!("('{}', '{}')", self.ip, self.instance.as_deref().unwrap_or(""))
    }
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Destination {}

impl Hash for Destination {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
#[path = "destination_test.rs"]
mod destination_test;
