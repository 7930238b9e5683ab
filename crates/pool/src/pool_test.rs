//! Pool state machine tests

use super::*;

fn dest(s: &str) -> Destination {
    Destination::parse(s).unwrap()
}

#[test]
fn test_register_is_idempotent() {
    let (pool, _retry_rx) = Pool::new(Distribution::Broadcast, 16);
    let d = dest("127.0.0.1:2101");

    pool.register(&d);
    pool.register(&d);

    assert!(pool.is_registered(d.name()));
    assert_eq!(pool.registered_names(), vec!["127.0.0.1:2101".to_string()]);
    assert!(!pool.has_conn(d.name()));
}

#[test]
fn test_add_conn_creates_queue_and_ring_entries() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let d = dest("127.0.0.1:2101");

    pool.register(&d);
    pool.add_conn(&d);

    assert!(pool.has_conn(d.name()));
    let view = pool.view();
    assert_eq!(view.lookup("stats.counters.foo").unwrap(), d.name());
}

#[test]
fn test_add_conn_twice_keeps_existing_queue() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let d = dest("127.0.0.1:2101");

    pool.add_conn(&d);
    pool.conn(d.name())
        .unwrap()
        .try_push(Record::from("m.a 1 0"))
        .unwrap();

    pool.add_conn(&d);
    assert_eq!(pool.conn(d.name()).unwrap().len(), 1);
}

#[test]
fn test_remove_conn_clears_ring_with_queue() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let d = dest("127.0.0.1:2101");

    pool.register(&d);
    pool.add_conn(&d);
    pool.remove_conn(d.name());

    assert!(!pool.has_conn(d.name()));
    assert!(pool.is_registered(d.name()));
    assert!(matches!(
        pool.view().lookup("stats.counters.foo"),
        Err(PoolError::EmptyRing)
    ));
}

#[test]
fn test_remove_conn_missing_is_noop() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    pool.remove_conn("127.0.0.1:2101");
    assert!(pool.active_names().is_empty());
}

#[tokio::test]
async fn test_remove_conn_redistributes_residual_under_hash_route() {
    let (pool, mut retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let d = dest("127.0.0.1:2101");

    pool.add_conn(&d);
    let queue = pool.conn(d.name()).unwrap();
    queue.try_push(Record::from("m.a 1 0")).unwrap();
    queue.try_push(Record::from("m.b 2 0")).unwrap();

    pool.remove_conn(d.name());

    let first = retry_rx.recv().await.unwrap();
    let second = retry_rx.recv().await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first.records()[0].as_str(), "m.a 1 0");
    assert_eq!(second.records()[0].as_str(), "m.b 2 0");
    assert_eq!(pool.retry_depth(), 2);
}

#[test]
fn test_remove_conn_drops_residual_under_broadcast() {
    let (pool, mut retry_rx) = Pool::new(Distribution::Broadcast, 16);
    let d = dest("127.0.0.1:2101");

    pool.add_conn(&d);
    pool.conn(d.name())
        .unwrap()
        .try_push(Record::from("m.a 1 0"))
        .unwrap();

    pool.remove_conn(d.name());

    assert!(retry_rx.try_recv().is_err());
    assert_eq!(pool.retry_depth(), 0);
}

#[test]
fn test_unregister_removes_conn_too() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    let d = dest("127.0.0.1:2101");

    pool.register(&d);
    pool.add_conn(&d);
    pool.unregister(&d);

    assert!(!pool.is_registered(d.name()));
    assert!(!pool.has_conn(d.name()));
}

#[test]
fn test_connected_destinations_are_registered() {
    // Writers register before dialing; the pool never holds a conn for a
    // name missing from registered when driven through that sequence.
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);
    for name in ["127.0.0.1:2101", "127.0.0.1:2102:b"] {
        let d = dest(name);
        pool.register(&d);
        pool.add_conn(&d);
    }

    let registered = pool.registered_names();
    for active in pool.active_names() {
        assert!(registered.contains(&active));
    }
}

#[test]
fn test_retry_push_bounded_drop() {
    let (pool, _retry_rx) = Pool::new(Distribution::HashRoute, 16);

    for _ in 0..RETRY_QUEUE_CAP {
        assert!(pool.retry_push(Batch::from(vec![Record::from("m.a 1 0")])));
    }
    assert!(!pool.retry_push(Batch::from(vec![Record::from("m.z 1 0")])));
    assert_eq!(pool.retry_dropped(), 1);
    assert_eq!(pool.retry_depth(), RETRY_QUEUE_CAP);
}

#[test]
fn test_reclaim_respects_distribution() {
    let (broadcast_pool, mut broadcast_rx) = Pool::new(Distribution::Broadcast, 16);
    broadcast_pool.reclaim(Record::from("m.a 1 0"));
    assert!(broadcast_rx.try_recv().is_err());

    let (route_pool, mut route_rx) = Pool::new(Distribution::HashRoute, 16);
    route_pool.reclaim(Record::from("m.a 1 0"));
    assert_eq!(route_rx.try_recv().unwrap().len(), 1);
}

#[test]
fn test_distribution_parse() {
    assert_eq!(
        "broadcast".parse::<Distribution>().unwrap(),
        Distribution::Broadcast
    );
    assert_eq!(
        "hash-route".parse::<Distribution>().unwrap(),
        Distribution::HashRoute
    );
    assert!("round-robin".parse::<Distribution>().is_err());
}
