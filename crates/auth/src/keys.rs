//! Process-local API key set.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::sync::KvPair;

/// The current set of accepted API keys.
///
/// A key is a bearer credential; its name is used for logging and,
/// optionally, as a metric prefix. All mutation happens under the map's
/// lock so validation always sees a complete set.
#[derive(Debug, Default)]
pub struct ApiKeys {
    keys: Mutex<HashMap<String, String>>,
}

impl ApiKeys {
    /// An empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a single key.
    pub fn insert(&self, key: impl Into<String>, name: impl Into<String>) {
        self.keys.lock().insert(key.into(), name.into());
    }

    /// Install the static development key `123` -> `dev`.
    pub fn install_dev_key(&self) {
        self.insert("123", "dev");
        tracing::info!("running in dev-mode: API key set to '123'");
    }

    /// Look up a key's name.
    pub fn name_for_key(&self, key: &str) -> Option<String> {
        self.keys.lock().get(key).cloned()
    }

    /// Whether any key carries this name.
    pub fn name_exists(&self, name: &str) -> bool {
        self.keys.lock().values().any(|n| n == name)
    }

    /// Number of keys currently installed.
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    /// Reconcile the local set against a remote listing.
    ///
    /// Entries present remotely but not locally are inserted; local keys
    /// absent from the remote listing are deleted. The listing is treated
    /// as a snapshot of current truth. Returns `(added, removed)`.
    pub fn sync(&self, remote: &[KvPair]) -> (usize, usize) {
        let mut keys = self.keys.lock();
        let mut added = 0;
        let mut removed = 0;

        for pair in remote {
            if !keys.contains_key(&pair.value) {
                keys.insert(pair.value.clone(), pair.name().to_string());
                added += 1;
            }
        }

        let before = keys.len();
        keys.retain(|key, _| remote.iter().any(|pair| pair.value == *key));
        removed += before - keys.len();

        (added, removed)
    }
}

#[cfg(test)]
#[path = "keys_test.rs"]
mod keys_test;
