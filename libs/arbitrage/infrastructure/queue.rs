//! Distribution queue between the exchange sessions and the analysis loop
//!
//! Bounded, multi-producer / single-consumer, lossy: a push into a full queue
//! evicts the oldest item instead of waiting. For a live spread monitor a
//! stale quote is worth less than a missing one.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// Result of a [`DropOldestQueue::push`]
#[derive(Debug, PartialEq)]
pub enum PushOutcome<T> {
    Accepted,
    /// Accepted; this oldest item was dropped to make room
    Evicted(T),
    /// Queue is closed; the item is handed back
    Rejected(T),
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub pushed: u64,
    pub dropped: u64,
}

pub struct DropOldestQueue<T> {
    buffer: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    /// `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue without ever blocking on the consumer
    pub fn push(&self, item: T) -> PushOutcome<T> {
        if self.closed.load(Ordering::Acquire) {
            return PushOutcome::Rejected(item);
        }

        let evicted = {
            let mut buffer = self.buffer.lock();
            let evicted = if buffer.len() >= self.capacity {
                buffer.pop_front()
            } else {
                None
            };
            buffer.push_back(item);
            evicted
        };

        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();

        match evicted {
            Some(old) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "[Queue] Full ({} items), dropped oldest ({} dropped so far)",
                    self.capacity, dropped
                );
                PushOutcome::Evicted(old)
            }
            None => PushOutcome::Accepted,
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.buffer.lock().pop_front()
    }

    /// Next item in arrival order
    ///
    /// Waits while the queue is empty; returns `None` once the queue is
    /// closed and fully drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push in between is not missed
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Remove queued items for which `keep` is false; returns how many went
    ///
    /// Purged items do not count as dropped.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut buffer = self.buffer.lock();
        let before = buffer.len();
        buffer.retain(|item| keep(item));
        before - buffer.len()
    }

    /// Refuse further pushes and wake the consumer; queued items stay poppable
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            len: self.len(),
            capacity: self.capacity,
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone> DropOldestQueue<T> {
    /// Copy of the queued items, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.buffer.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = DropOldestQueue::new(4);
        for i in 0..3 {
            assert_eq!(queue.push(i), PushOutcome::Accepted);
        }
        assert_eq!(queue.try_pop(), Some(0));
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue = DropOldestQueue::new(3);
        for i in 0..3 {
            queue.push(i);
        }
        assert_eq!(queue.push(3), PushOutcome::Evicted(0));
        assert_eq!(queue.push(4), PushOutcome::Evicted(1));
        assert_eq!(queue.snapshot(), vec![2, 3, 4]);

        let stats = queue.stats();
        assert_eq!(stats.len, 3);
        assert_eq!(stats.pushed, 5);
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = DropOldestQueue::new(2);
        queue.push(1);
        queue.close();
        assert_eq!(queue.push(2), PushOutcome::Rejected(2));
        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn test_retain_purges_without_counting_drops() {
        let queue = DropOldestQueue::new(8);
        for i in 0..6 {
            queue.push(i);
        }
        assert_eq!(queue.retain(|i| i % 2 == 0), 3);
        assert_eq!(queue.snapshot(), vec![0, 2, 4]);
        assert_eq!(queue.stats().dropped, 0);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(DropOldestQueue::new(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(42);

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Some(42));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = DropOldestQueue::new(8);
        queue.push(1);
        queue.push(2);
        queue.close();

        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let queue = Arc::new(DropOldestQueue::<u32>::new(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, None);
    }
}
