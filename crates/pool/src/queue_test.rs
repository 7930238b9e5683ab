//! Record queue tests

use super::*;

fn record(s: &str) -> Record {
    Record::from(s)
}

#[test]
fn test_push_pop_fifo() {
    let q = RecordQueue::new(8);
    q.try_push(record("a 1 0")).unwrap();
    q.try_push(record("b 2 0")).unwrap();

    assert!(matches!(q.try_pop(), Pop::Record(r) if r.as_str() == "a 1 0"));
    assert!(matches!(q.try_pop(), Pop::Record(r) if r.as_str() == "b 2 0"));
    assert!(matches!(q.try_pop(), Pop::Empty));
}

#[test]
fn test_push_full_queue_refused() {
    let q = RecordQueue::new(2);
    q.try_push(record("a 1 0")).unwrap();
    q.try_push(record("b 2 0")).unwrap();

    assert_eq!(q.try_push(record("c 3 0")), Err(PushError::Full));
    assert_eq!(q.len(), 2);
}

#[test]
fn test_push_closed_queue_refused() {
    let q = RecordQueue::new(2);
    q.close();
    assert_eq!(q.try_push(record("a 1 0")), Err(PushError::Closed));
}

#[test]
fn test_pop_drains_backlog_before_reporting_closed() {
    let q = RecordQueue::new(2);
    q.try_push(record("a 1 0")).unwrap();
    q.close();

    assert!(matches!(q.try_pop(), Pop::Record(_)));
    assert!(matches!(q.try_pop(), Pop::Closed));
}

#[test]
fn test_requeue_front_is_head_of_line() {
    let q = RecordQueue::new(2);
    q.try_push(record("a 1 0")).unwrap();
    q.try_push(record("b 2 0")).unwrap();

    let Pop::Record(first) = q.try_pop() else {
        panic!("expected record");
    };
    q.requeue_front(first).unwrap();

    assert!(matches!(q.try_pop(), Pop::Record(r) if r.as_str() == "a 1 0"));
}

#[test]
fn test_requeue_front_ignores_capacity() {
    let q = RecordQueue::new(1);
    q.try_push(record("a 1 0")).unwrap();
    q.requeue_front(record("b 2 0")).unwrap();
    assert_eq!(q.len(), 2);
}

#[test]
fn test_requeue_front_returns_record_when_closed() {
    let q = RecordQueue::new(2);
    q.close();
    let rejected = q.requeue_front(record("a 1 0")).unwrap_err();
    assert_eq!(rejected.as_str(), "a 1 0");
}

#[test]
fn test_drain_empties_queue() {
    let q = RecordQueue::new(4);
    q.try_push(record("a 1 0")).unwrap();
    q.try_push(record("b 2 0")).unwrap();

    let drained = q.drain();
    assert_eq!(drained.len(), 2);
    assert!(q.is_empty());
}
