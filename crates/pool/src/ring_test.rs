//! Hash ring tests

use super::*;

fn corpus() -> Vec<String> {
    (0..200)
        .map(|i| format!("stats.counters.service{i}.requests"))
        .collect()
}

#[test]
fn test_hash_key_known_digests() {
    // First two MD5 bytes, big-endian: d41d8cd9... -> 0xd41d, etc.
    assert_eq!(hash_key(""), 0xd41d);
    assert_eq!(hash_key("a"), 0x0cc1);
    assert_eq!(hash_key("abc"), 0x9001);
}

#[test]
fn test_hash_key_sixteen_bit_keyspace() {
    for key in corpus() {
        let h = hash_key(&key);
        assert!((0..=0xffff).contains(&h));
    }
}

#[test]
fn test_add_node_places_vnodes() {
    let mut ring = HashRing::new(100);
    ring.add_node("('127.0.0.1', 'a')", "127.0.0.1:2003:a");
    assert_eq!(ring.len(), 100);

    ring.add_node("('127.0.0.1', 'b')", "127.0.0.1:2004:b");
    assert_eq!(ring.len(), 200);
}

#[test]
fn test_lookup_empty_ring_fails() {
    let ring = HashRing::new(100);
    assert!(matches!(
        ring.get_node("stats.counters.foo"),
        Err(PoolError::EmptyRing)
    ));
}

#[test]
fn test_lookup_is_deterministic() {
    let build = || {
        let mut ring = HashRing::new(100);
        ring.add_node("('127.0.0.1', 'a')", "127.0.0.1:2003:a");
        ring.add_node("('127.0.0.1', 'b')", "127.0.0.1:2004:b");
        ring
    };

    let first = build();
    let second = build();
    for key in corpus() {
        assert_eq!(
            first.get_node(&key).unwrap(),
            second.get_node(&key).unwrap(),
            "key {key} resolved differently across identical rings"
        );
    }
}

#[test]
fn test_lookup_spreads_across_destinations() {
    let mut ring = HashRing::new(100);
    ring.add_node("('127.0.0.1', 'a')", "127.0.0.1:2003:a");
    ring.add_node("('127.0.0.1', 'b')", "127.0.0.1:2004:b");

    let mut owners: std::collections::HashSet<String> = std::collections::HashSet::new();
    for key in corpus() {
        owners.insert(ring.get_node(&key).unwrap().to_string());
    }
    assert_eq!(owners.len(), 2, "one destination owned the whole corpus");
}

#[test]
fn test_remove_node_drops_all_positions() {
    let mut ring = HashRing::new(100);
    ring.add_node("('127.0.0.1', 'a')", "127.0.0.1:2003:a");
    ring.add_node("('127.0.0.1', 'b')", "127.0.0.1:2004:b");

    ring.remove_node("127.0.0.1:2003:a");
    assert_eq!(ring.len(), 100);
    for key in corpus() {
        assert_eq!(ring.get_node(&key).unwrap(), "127.0.0.1:2004:b");
    }
}

#[test]
fn test_node_at_picks_lowest_id_at_or_above() {
    let mut ring = HashRing::new(100);
    ring.insert_raw(100, "a");
    ring.insert_raw(200, "b");
    ring.insert_raw(300, "c");

    assert_eq!(ring.node_at(50).unwrap(), "a");
    assert_eq!(ring.node_at(100).unwrap(), "a");
    assert_eq!(ring.node_at(101).unwrap(), "b");
    assert_eq!(ring.node_at(300).unwrap(), "c");
}

#[test]
fn test_node_at_wraps_past_end() {
    let mut ring = HashRing::new(100);
    ring.insert_raw(100, "a");
    ring.insert_raw(200, "b");

    assert_eq!(ring.node_at(201).unwrap(), "a");
    assert_eq!(ring.node_at(0xffff).unwrap(), "a");
}

#[test]
fn test_node_at_ties_keep_insertion_order() {
    let mut ring = HashRing::new(100);
    ring.insert_raw(100, "first");
    ring.insert_raw(100, "second");

    assert_eq!(ring.node_at(100).unwrap(), "first");
    assert_eq!(ring.node_at(99).unwrap(), "first");
}
