//! A single metric line in transit.

use std::fmt;
use std::sync::Arc;

/// One Graphite plaintext line, without its trailing newline.
///
/// Polymur treats the line as opaque text: the only structure it relies on
/// is the first whitespace-delimited token, which serves as the routing key
/// for hash-route distribution. Cloning a record is an `Arc` bump, so the
/// same record may sit in many destination queues at once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record(Arc<str>);

impl Record {
    /// Wrap a line as a record. The caller is responsible for stripping the
    /// newline delimiter; ingress paths drop empty lines before this point.
    pub fn new(line: impl Into<Arc<str>>) -> Self {
        Self(line.into())
    }

    /// The record text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the record text in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record holds no text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The routing key: the substring up to the first whitespace.
    ///
    /// Returns `None` for records that contain no non-whitespace content;
    /// callers treat that the same as a ring lookup failure.
    #[inline]
    pub fn routing_key(&self) -> Option<&str> {
        self.0.split_whitespace().next()
    }
}

impl From<String> for Record {
    fn from(line: String) -> Self {
        Self::new(line)
    }
}

impl From<&str> for Record {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
