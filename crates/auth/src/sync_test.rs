//! Key sync tests

use std::sync::Mutex;
use std::time::Duration;

use super::*;

/// A KV store fed from a script of listings, one per call.
struct ScriptedStore {
    listings: Mutex<Vec<Result<Vec<KvPair>, KeySyncError>>>,
}

impl ScriptedStore {
    fn new(listings: Vec<Result<Vec<KvPair>, KeySyncError>>) -> Self {
        Self {
            listings: Mutex::new(listings),
        }
    }
}

#[async_trait]
impl KeyStore for ScriptedStore {
    async fn list(&self, _prefix: &str) -> Result<Vec<KvPair>, KeySyncError> {
        let mut listings = self.listings.lock().unwrap();
        if listings.is_empty() {
            Ok(Vec::new())
        } else {
            listings.remove(0)
        }
    }
}

fn pair(name: &str, value: &str) -> KvPair {
    KvPair {
        path: format!("{KEY_PREFIX}{name}"),
        value: value.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sync_applies_remote_listing() {
    let keys = Arc::new(ApiKeys::new());
    let store = Arc::new(ScriptedStore::new(vec![Ok(vec![pair("acme", "k1")])]));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        KeySync::new(Arc::clone(&keys), store)
            .with_interval(Duration::from_secs(30))
            .run(cancel.clone()),
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sync_serves_stale_keys_across_failures() {
    let keys = Arc::new(ApiKeys::new());
    let store = Arc::new(ScriptedStore::new(vec![
        Ok(vec![pair("acme", "k1")]),
        Err(KeySyncError::Decode {
            path: "polymur/gateway/keys/acme".into(),
        }),
    ]));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        KeySync::new(Arc::clone(&keys), store)
            .with_interval(Duration::from_secs(30))
            .run(cancel.clone()),
    );

    // First refresh loads the key; the failing second refresh leaves it
    // serving.
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sync_removes_revoked_keys_on_next_tick() {
    let keys = Arc::new(ApiKeys::new());
    let store = Arc::new(ScriptedStore::new(vec![
        Ok(vec![pair("acme", "k1"), pair("globex", "k2")]),
        Ok(vec![pair("acme", "k1")]),
    ]));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        KeySync::new(Arc::clone(&keys), store)
            .with_interval(Duration::from_secs(30))
            .run(cancel.clone()),
    );

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(keys.name_for_key("k2"), None);
    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));

    cancel.cancel();
    task.await.unwrap();
}
