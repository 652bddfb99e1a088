//! Bounded ingestion queue with drop-oldest overflow

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AcquisitionError, Result};

/// Counters for queue monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub total_pushed: u64,
    pub total_dropped: u64,
    pub total_drained: u64,
    pub current_size: usize,
    pub capacity: usize,
}

/// Bounded FIFO absorbing bursty producers against slower consumers
///
/// `push` never blocks: once `capacity` entries are queued, the oldest
/// unread entry is evicted to admit the new one. All access goes through
/// one mutex, so a concurrent `push` and `drain_all` never interleave.
pub struct IngestQueue<T> {
    ring: Mutex<HeapRb<T>>,
    capacity: usize,
    total_pushed: AtomicU64,
    total_dropped: AtomicU64,
    total_drained: AtomicU64,
}

impl<T> IngestQueue<T> {
    /// Create new queue holding at most `capacity` entries
    ///
    /// # Example
    ///
    /// ```
    /// use biolink_acquisition::IngestQueue;
    ///
    /// let queue = IngestQueue::new(2).unwrap();
    /// queue.push(1);
    /// queue.push(2);
    /// queue.push(3); // evicts 1
    /// assert_eq!(queue.drain_all(), vec![2, 3]);
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AcquisitionError::invalid_config("Queue capacity cannot be zero"));
        }

        Ok(Self {
            ring: Mutex::new(HeapRb::new(capacity)),
            capacity,
            total_pushed: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            total_drained: AtomicU64::new(0),
        })
    }

    /// Append an entry, returning the evicted oldest entry if the queue was full
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = self.ring.lock().push_overwrite(item);

        self.total_pushed.fetch_add(1, Ordering::Relaxed);
        if evicted.is_some() {
            self.total_dropped.fetch_add(1, Ordering::Relaxed);
        }

        evicted
    }

    /// Remove and return every queued entry, oldest first
    pub fn drain_all(&self) -> Vec<T> {
        let mut ring = self.ring.lock();
        let mut items = Vec::with_capacity(ring.occupied_len());

        while let Some(item) = ring.try_pop() {
            items.push(item);
        }
        drop(ring);

        self.total_drained
            .fetch_add(items.len() as u64, Ordering::Relaxed);
        items
    }

    /// Get number of entries currently queued
    pub fn len(&self) -> usize {
        self.ring.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            total_pushed: self.total_pushed.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            total_drained: self.total_drained.load(Ordering::Relaxed),
            current_size: self.len(),
            capacity: self.capacity,
        }
    }
}
