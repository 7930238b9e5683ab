//! API key set tests

use super::*;

fn pair(path: &str, value: &str) -> KvPair {
    KvPair {
        path: path.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn test_insert_and_lookup() {
    let keys = ApiKeys::new();
    keys.insert("k1", "acme");

    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));
    assert_eq!(keys.name_for_key("k2"), None);
}

#[test]
fn test_name_exists() {
    let keys = ApiKeys::new();
    keys.insert("k1", "acme");

    assert!(keys.name_exists("acme"));
    assert!(!keys.name_exists("globex"));
}

#[test]
fn test_dev_key() {
    let keys = ApiKeys::new();
    keys.install_dev_key();
    assert_eq!(keys.name_for_key("123"), Some("dev".to_string()));
}

#[test]
fn test_sync_adds_new_entries() {
    let keys = ApiKeys::new();
    let remote = vec![
        pair("polymur/gateway/keys/acme", "k1"),
        pair("polymur/gateway/keys/globex", "k2"),
    ];

    let (added, removed) = keys.sync(&remote);
    assert_eq!((added, removed), (2, 0));
    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));
    assert_eq!(keys.name_for_key("k2"), Some("globex".to_string()));
}

#[test]
fn test_sync_removes_absent_entries() {
    let keys = ApiKeys::new();
    keys.insert("stale", "old-proxy");
    keys.insert("k1", "acme");

    let remote = vec![pair("polymur/gateway/keys/acme", "k1")];
    let (added, removed) = keys.sync(&remote);

    assert_eq!((added, removed), (0, 1));
    assert_eq!(keys.name_for_key("stale"), None);
    assert_eq!(keys.name_for_key("k1"), Some("acme".to_string()));
}

#[test]
fn test_sync_is_idempotent() {
    let keys = ApiKeys::new();
    let remote = vec![pair("polymur/gateway/keys/acme", "k1")];

    keys.sync(&remote);
    let (added, removed) = keys.sync(&remote);

    assert_eq!((added, removed), (0, 0));
    assert_eq!(keys.len(), 1);
}

#[test]
fn test_kv_pair_name_is_last_segment() {
    assert_eq!(pair("polymur/gateway/keys/acme", "k1").name(), "acme");
    assert_eq!(pair("acme", "k1").name(), "acme");
}
