//! Consistent-hash ring compatible with Graphite carbon-cache.
//!
//! Given the same settings (vnode count, destination IPs and instances) the
//! ring yields the same node by name for a given key as carbon's
//! consistent-hashing relay, so polymur can replace it in the wire path
//! without resharding metrics.

use md5::{Digest, Md5};

use crate::PoolError;

/// Default virtual nodes per destination, matching carbon-cache.
pub const DEFAULT_VNODES: usize = 100;

/// A ring position mapping a hashed vnode id to a destination name.
#[derive(Clone, Debug)]
struct RingNode {
    id: i32,
    name: String,
}

/// A consistent-hash ring with a configurable number of vnodes per
/// destination.
///
/// Positions are kept as a list sorted ascending by id. Equal ids are
/// permitted and keep insertion order (the sort is stable); lookups take the
/// first node satisfying the search. Writes are serialized by the owning
/// pool's lock.
#[derive(Clone, Debug)]
pub struct HashRing {
    vnodes: usize,
    nodes: Vec<RingNode>,
}

impl HashRing {
    /// Create an empty ring placing `vnodes` positions per destination.
    pub fn new(vnodes: usize) -> Self {
        Self {
            vnodes,
            nodes: Vec::new(),
        }
    }

    /// Vnodes placed per destination.
    #[inline]
    pub fn vnodes(&self) -> usize {
        self.vnodes
    }

    /// Total ring positions currently present.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the ring holds no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a destination to the ring.
    ///
    /// `keyname` is the hashing identity (carbon's `('<ip>', '<instance>')`
    /// tuple literal) and is suffixed `:<i>` per vnode; `name` is what
    /// lookups return, used by callers to find the outbound queue.
    pub fn add_node(&mut self, keyname: &str, name: &str) {
        for i in 0..self.vnodes {
            let id = hash_key(&format!("{keyname}:{i}"));
            self.nodes.push(RingNode {
                id,
                name: name.to_string(),
            });
        }
        self.nodes.sort_by_key(|n| n.id);
    }

    /// Remove every position belonging to `name`.
    ///
    /// Linear scan; destination churn is rare.
    pub fn remove_node(&mut self, name: &str) {
        self.nodes.retain(|n| n.name != name);
    }

    /// Resolve a routing key to a destination name.
    pub fn get_node(&self, key: &str) -> Result<&str, PoolError> {
        self.node_at(hash_key(key))
    }

    /// Resolve a raw ring position: the lowest node id >= `id`, wrapping to
    /// the start of the ring past the end.
    fn node_at(&self, id: i32) -> Result<&str, PoolError> {
        if self.nodes.is_empty() {
            return Err(PoolError::EmptyRing);
        }
        let idx = self.nodes.partition_point(|n| n.id < id) % self.nodes.len();
        Ok(&self.nodes[idx].name)
    }

    #[cfg(test)]
    fn insert_raw(&mut self, id: i32, name: &str) {
        self.nodes.push(RingNode {
            id,
            name: name.to_string(),
        });
        self.nodes.sort_by_key(|n| n.id);
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_VNODES)
    }
}

/// Hash an input string to its ring position.
///
/// Carbon-cache takes the first two bytes of the MD5 digest, renders them as
/// big-endian hexadecimal and parses the result as a signed 32-bit integer.
/// The 16-bit keyspace is intentional; it is wire compatibility, not a
/// shortcut.
pub(crate) fn hash_key(s: &str) -> i32 {
    let digest = Md5::digest(s.as_bytes());
    i32::from(u16::from_be_bytes([digest[0], digest[1]]))
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod ring_test;
