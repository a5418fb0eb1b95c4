//! Integer channels connecting engines and adapters.
//!
//! A [`Channel`] is an unbounded FIFO handle. Cloning the handle shares the
//! underlying queue, which is how one engine's output becomes another's
//! input. The queue is guarded by a mutex and a condition variable so the
//! same channel works for cooperative single-thread driving and for one
//! worker thread per engine.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    queue: Mutex<VecDeque<i64>>,
    ready: Condvar,
}

/// Unbounded point-to-point integer FIFO.
#[derive(Clone, Default)]
pub struct Channel {
    shared: Arc<Shared>,
}

impl Channel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel pre-loaded with values.
    pub fn with_values<I: IntoIterator<Item = i64>>(values: I) -> Self {
        let channel = Self::new();
        channel.extend(values);
        channel
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<i64>> {
        // A panicking peer cannot leave a VecDeque half-updated.
        self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a value.
    pub fn push(&self, value: i64) {
        self.lock().push_back(value);
        self.shared.ready.notify_one();
    }

    /// Append several values in order.
    pub fn extend<I: IntoIterator<Item = i64>>(&self, values: I) {
        self.lock().extend(values);
        self.shared.ready.notify_one();
    }

    /// Remove and return the oldest value, if any.
    pub fn pop(&self) -> Option<i64> {
        self.lock().pop_front()
    }

    /// Wait up to `timeout` for a value to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<i64> {
        let guard = self.lock();
        let (mut guard, _) = self
            .shared
            .ready
            .wait_timeout_while(guard, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        guard.pop_front()
    }

    /// Remove and return every queued value.
    pub fn drain(&self) -> Vec<i64> {
        self.lock().drain(..).collect()
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued values without consuming them.
    pub fn peek_all(&self) -> Vec<i64> {
        self.lock().iter().copied().collect()
    }

    /// True if both handles refer to the same queue.
    pub fn same_channel(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("queued", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let ch = Channel::with_values([1, 2]);
        ch.push(3);
        assert_eq!(ch.pop(), Some(1));
        assert_eq!(ch.drain(), vec![2, 3]);
        assert!(ch.is_empty());
        assert_eq!(ch.pop(), None);
    }

    #[test]
    fn test_clones_share_queue() {
        let producer = Channel::new();
        let consumer = producer.clone();
        producer.push(42);
        assert!(consumer.same_channel(&producer));
        assert_eq!(consumer.len(), 1);
        assert_eq!(consumer.peek_all(), vec![42]);
        assert_eq!(consumer.pop(), Some(42));
        assert!(!producer.same_channel(&Channel::new()));
    }

    #[test]
    fn test_pop_timeout_expires() {
        let ch = Channel::new();
        assert_eq!(ch.pop_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_pop_timeout_wakes_on_push() {
        let ch = Channel::new();
        let producer = ch.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(7);
        });
        assert_eq!(ch.pop_timeout(Duration::from_secs(5)), Some(7));
        handle.join().unwrap();
    }
}
