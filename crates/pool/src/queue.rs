//! Bounded per-destination record queues.

use std::collections::VecDeque;

use parking_lot::Mutex;
use polymur_protocol::Record;

/// Outcome of a non-blocking pop.
#[derive(Debug)]
pub enum Pop {
    /// The oldest queued record.
    Record(Record),
    /// The queue is open but currently empty.
    Empty,
    /// The queue has been closed; the destination left the pool.
    Closed,
}

/// Why a non-blocking push was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum PushError {
    /// The queue is at capacity; the destination is back-pressured.
    Full,
    /// The queue has been closed.
    Closed,
}

/// A bounded FIFO of records feeding one destination writer.
///
/// The distribution engine pushes to the tail without blocking; the
/// destination's writer is the only consumer. On a failed send the writer
/// reclaims its record at the head so per-destination delivery order is
/// preserved across reconnects. Closing the queue is how the pool tells the
/// writer its destination left the pool; residual records are drained by
/// whoever closed it.
#[derive(Debug)]
pub struct RecordQueue {
    cap: usize,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<Record>,
    closed: bool,
}

impl RecordQueue {
    /// A new open queue bounded at `cap` records.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(cap.min(1024)),
                closed: false,
            }),
        }
    }

    /// The configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Whether the queue currently holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Append a record without blocking.
    pub fn try_push(&self, record: Record) -> Result<(), PushError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(PushError::Closed);
        }
        if inner.records.len() >= self.cap {
            return Err(PushError::Full);
        }
        inner.records.push_back(record);
        Ok(())
    }

    /// Reclaim a record at the head of the queue.
    ///
    /// Used by the writer when a send fails mid-flight, so the record is the
    /// next one retried. The capacity bound is not applied: an in-flight
    /// record was already admitted once. Returns the record if the queue has
    /// closed in the meantime so the caller can reroute it.
    pub fn requeue_front(&self, record: Record) -> Result<(), Record> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(record);
        }
        inner.records.push_front(record);
        Ok(())
    }

    /// Take the oldest record without blocking.
    pub fn try_pop(&self) -> Pop {
        let mut inner = self.inner.lock();
        match inner.records.pop_front() {
            Some(record) => Pop::Record(record),
            None if inner.closed => Pop::Closed,
            None => Pop::Empty,
        }
    }

    /// Close the queue. Subsequent pushes fail and pops report `Closed`
    /// once the backlog is taken.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Remove and return every queued record.
    pub fn drain(&self) -> Vec<Record> {
        let mut inner = self.inner.lock();
        inner.records.drain(..).collect()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
