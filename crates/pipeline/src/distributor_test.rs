//! Distributor tests

use std::sync::Arc;

use polymur_pool::{Destination, Distribution, Pool, Pop};
use polymur_protocol::{Batch, Record};

use super::*;

fn dest(s: &str) -> Destination {
    Destination::parse(s).unwrap()
}

fn batch(lines: &[&str]) -> Batch {
    lines.iter().map(|l| Record::from(*l)).collect()
}

fn drain(pool: &Pool, name: &str) -> Vec<String> {
    let queue = pool.conn(name).unwrap();
    let mut out = Vec::new();
    while let Pop::Record(r) = queue.try_pop() {
        out.push(r.as_str().to_string());
    }
    out
}

#[test]
fn test_broadcast_delivers_to_every_destination_in_order() {
    let (pool, _retry_rx) = Pool::new(Distribution::Broadcast, 16);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2101");
    let b = dest("127.0.0.1:2102");
    pool.register(&a);
    pool.register(&b);
    pool.add_conn(&a);
    pool.add_conn(&b);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["m.a 1 1000", "m.b 2 1001"]));

    assert_eq!(drain(&pool, a.name()), vec!["m.a 1 1000", "m.b 2 1001"]);
    assert_eq!(drain(&pool, b.name()), vec!["m.a 1 1000", "m.b 2 1001"]);
}

#[test]
fn test_broadcast_full_queue_drops_silently() {
    let (pool, mut retry_rx) = Pool::new(Distribution::Broadcast, 1);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2101");
    pool.register(&a);
    pool.add_conn(&a);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["m.a 1 0", "m.b 2 0", "m.c 3 0"]));

    assert_eq!(drain(&pool, a.name()), vec!["m.a 1 0"]);
    assert!(retry_rx.try_recv().is_err());
    assert_eq!(distributor.metrics().snapshot().records_backpressured, 2);
}

#[test]
fn test_hash_route_single_destination_gets_everything() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2101");
    pool.register(&a);
    pool.add_conn(&a);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["m.a 1 0", "m.b 2 0"]));

    assert_eq!(drain(&pool, a.name()), vec!["m.a 1 0", "m.b 2 0"]);
}

#[test]
fn test_hash_route_is_exactly_once_across_destinations() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 1024);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2003:a");
    let b = dest("127.0.0.1:2004:b");
    for d in [&a, &b] {
        pool.register(d);
        pool.add_conn(d);
    }

    let lines: Vec<String> = (0..100)
        .map(|i| format!("stats.counters.s{i}.requests 1 0"))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&refs));

    let from_a = drain(&pool, a.name());
    let from_b = drain(&pool, b.name());
    assert_eq!(from_a.len() + from_b.len(), 100);
    for line in &lines {
        let copies = from_a.iter().filter(|l| *l == line).count()
            + from_b.iter().filter(|l| *l == line).count();
        assert_eq!(copies, 1, "{line} delivered {copies} times");
    }
}

#[test]
fn test_hash_route_routing_matches_ring_lookup() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 64);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2003:a");
    let b = dest("127.0.0.1:2004:b");
    for d in [&a, &b] {
        pool.register(d);
        pool.add_conn(d);
    }

    let line = "stats.counters.foo 1 0";
    let owner = pool
        .view()
        .lookup("stats.counters.foo")
        .unwrap()
        .to_string();

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&[line]));

    assert_eq!(drain(&pool, &owner), vec![line.to_string()]);
}

#[test]
fn test_hash_route_empty_ring_drops() {
    let (pool, mut retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let pool = Arc::new(pool);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["m.a 1 0"]));

    assert!(retry_rx.try_recv().is_err());
    assert_eq!(distributor.metrics().snapshot().records_dropped, 1);
}

#[test]
fn test_hash_route_full_queue_goes_to_retry_as_singletons() {
    let (pool, mut retry_rx) = Pool::new(Distribution::HashRoute, 1);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2101");
    pool.register(&a);
    pool.add_conn(&a);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["m.a 1 0", "m.b 2 0", "m.c 3 0"]));

    assert_eq!(drain(&pool, a.name()), vec!["m.a 1 0"]);
    let first = retry_rx.try_recv().unwrap();
    let second = retry_rx.try_recv().unwrap();
    assert_eq!(first.records()[0].as_str(), "m.b 2 0");
    assert_eq!(second.records()[0].as_str(), "m.c 3 0");
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}

#[test]
fn test_hash_route_whitespace_only_record_drops() {
    let (pool, mut retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let pool = Arc::new(pool);
    let a = dest("127.0.0.1:2101");
    pool.register(&a);
    pool.add_conn(&a);

    let distributor = Distributor::new(Arc::clone(&pool));
    distributor.dispatch(&batch(&["   "]));

    assert!(drain(&pool, a.name()).is_empty());
    assert!(retry_rx.try_recv().is_err());
}
