use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::target::Target;

/// Thread-safe work queue shared by the probe workers.
///
/// Producers finish enqueuing before any worker starts, so `len` is fixed at
/// pool-start time. A descriptor is handed to exactly one worker; the queue
/// counts as drained only once every dequeued descriptor has been
/// acknowledged through `mark_done`.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<Target>>,
    total: AtomicUsize,
    done: AtomicUsize,
    drained: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_targets(targets: Vec<Target>) -> Self {
        let queue = Self::new();
        for target in targets {
            queue.enqueue(target);
        }
        queue
    }

    pub fn enqueue(&self, target: Target) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .expect("task queue mutex poisoned")
            .push_back(target);
    }

    /// Total number of descriptors ever enqueued.
    pub fn len(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop one descriptor, or `None` when no work remains. Never blocks.
    pub fn try_dequeue(&self) -> Option<Target> {
        self.pending
            .lock()
            .expect("task queue mutex poisoned")
            .pop_front()
    }

    /// Acknowledge completion of one dequeued descriptor.
    pub fn mark_done(&self) {
        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        if done >= self.total.load(Ordering::Acquire) {
            self.drained.notify_waiters();
        }
    }

    pub fn is_drained(&self) -> bool {
        self.done.load(Ordering::Acquire) >= self.total.load(Ordering::Acquire)
    }

    /// Block the caller until every enqueued descriptor has been dequeued
    /// and acknowledged.
    pub async fn wait_until_drained(&self) {
        loop {
            if self.is_drained() {
                return;
            }
            let notified = self.drained.notified();
            // Re-check after registering so a notify between the first check
            // and registration is not lost.
            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn targets(n: usize) -> Vec<Target> {
        (0..n)
            .map(|i| Target {
                host: format!("10.0.0.{i}"),
                port: 6379,
                password: None,
            })
            .collect()
    }

    #[test]
    fn test_dequeue_empty_returns_none() {
        let queue = TaskQueue::new();
        assert!(queue.try_dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_order_and_len() {
        let queue = TaskQueue::from_targets(targets(3));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_dequeue().unwrap().host, "10.0.0.0");
        assert_eq!(queue.try_dequeue().unwrap().host, "10.0.0.1");
        // len reports total enqueued, not remaining
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_drained_requires_acknowledgement() {
        let queue = TaskQueue::from_targets(targets(2));
        assert!(!queue.is_drained());
        queue.try_dequeue().unwrap();
        queue.try_dequeue().unwrap();
        assert!(!queue.is_drained());
        queue.mark_done();
        queue.mark_done();
        assert!(queue.is_drained());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dequeue_is_exactly_once() {
        let queue = Arc::new(TaskQueue::from_targets(targets(200)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(target) = queue.try_dequeue() {
                    seen.push(target.host);
                    queue.mark_done();
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        assert_eq!(all.len(), 200);
        let distinct: HashSet<_> = all.iter().collect();
        assert_eq!(distinct.len(), 200);

        queue.wait_until_drained().await;
        assert!(queue.is_drained());
    }
}
