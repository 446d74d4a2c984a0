//! Bounded FIFO of pending request URIs.
//!
//! [`DeliveryQueue`] is shared between any number of producers and the
//! sender loop, usually behind an `Arc`. Every operation takes the single
//! internal lock for an O(1) push, pop or length read, so producers never
//! wait on network I/O.

use std::collections::VecDeque;

use log::warn;
use parking_lot::Mutex;
use thiserror::Error;

use crate::rate_limited_warner::RateLimitedWarner;

/// Reasons a submission was not queued.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue already held more than `max_queue` items.
    #[error("delivery queue full (max_queue = {max_queue}); submission dropped")]
    Full { max_queue: usize },
}

/// Thread-safe queue of fully encoded request URIs.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    items: Mutex<VecDeque<String>>,
    warner: RateLimitedWarner,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom warner for drop notifications.
    pub fn with_warner(warner: RateLimitedWarner) -> Self {
        Self {
            items: Mutex::default(),
            warner,
        }
    }

    /// Append `uri` to the tail unless the queue is over capacity.
    ///
    /// The submission is dropped when the current length is strictly greater
    /// than `max_queue`; existing items are never evicted. Drops are reported
    /// through a rate-limited warning and the returned error, which callers
    /// treating telemetry as best effort may ignore.
    pub fn submit(&self, uri: impl Into<String>, max_queue: usize) -> Result<(), QueueError> {
        let accepted = {
            let mut items = self.items.lock();
            if items.len() > max_queue {
                false
            } else {
                items.push_back(uri.into());
                true
            }
        };
        if accepted {
            return Ok(());
        }
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("delivery queue full; dropped {count} submissions");
        });
        Err(QueueError::Full { max_queue })
    }

    /// Number of URIs waiting to be sent.
    pub fn waiting(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Remove and return the head of the queue.
    pub fn try_dequeue(&self) -> Option<String> {
        self.items.lock().pop_front()
    }

    /// Return an item to the head so it is the next one delivered.
    ///
    /// Used by the sender when shutdown interrupts an in-flight delivery.
    /// Capacity is not checked.
    pub fn requeue_front(&self, uri: String) {
        self.items.lock().push_front(uri);
    }

    /// Report any drops still held back by the rate limiter.
    pub fn flush_warnings(&self) {
        self.warner.flush(|count| {
            warn!("delivery queue full; dropped {count} submissions");
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn counts_accepted_items(#[case] n: usize) {
        let queue = DeliveryQueue::new();
        for i in 0..n {
            queue.submit(format!("uri-{i}"), 5).expect("below capacity");
        }
        assert_eq!(queue.waiting(), n);
        assert_eq!(queue.is_empty(), n == 0);
    }

    #[test]
    fn drops_only_when_length_exceeds_max() {
        let queue = DeliveryQueue::new();
        let max_queue = 3;
        // Length is compared before the push, so max_queue + 1 items fit.
        for i in 0..=max_queue {
            queue.submit(format!("uri-{i}"), max_queue).expect("accepted");
        }
        assert_eq!(queue.waiting(), max_queue + 1);
        assert_eq!(
            queue.submit("overflow", max_queue),
            Err(QueueError::Full { max_queue })
        );
        assert_eq!(queue.waiting(), max_queue + 1);
    }

    #[test]
    fn full_queue_keeps_existing_items() {
        let queue = DeliveryQueue::new();
        queue.submit("a", 0).expect("empty queue accepts");
        assert!(queue.submit("b", 0).is_err());
        assert_eq!(queue.try_dequeue().as_deref(), Some("a"));
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn dequeues_in_submission_order() {
        let queue = DeliveryQueue::new();
        for uri in ["a", "b", "c"] {
            queue.submit(uri, 10).expect("accepted");
        }
        let drained: Vec<_> = std::iter::from_fn(|| queue.try_dequeue()).collect();
        assert_eq!(drained, ["a", "b", "c"]);
    }

    #[test]
    fn requeue_front_preserves_order() {
        let queue = DeliveryQueue::new();
        queue.submit("a", 10).expect("accepted");
        queue.submit("b", 10).expect("accepted");
        let head = queue.try_dequeue().expect("head");
        queue.requeue_front(head);
        assert_eq!(queue.try_dequeue().as_deref(), Some("a"));
        assert_eq!(queue.try_dequeue().as_deref(), Some("b"));
    }

    #[test]
    fn concurrent_producers_are_all_counted() {
        let queue = Arc::new(DeliveryQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..25 {
                        queue.submit(format!("{t}-{i}"), 1000).expect("accepted");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("producer thread panicked");
        }
        assert_eq!(queue.waiting(), 100);
    }

    #[test]
    fn per_producer_order_is_kept_under_contention() {
        let queue = Arc::new(DeliveryQueue::new());
        let handles: Vec<_> = (0..3)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..50 {
                        queue.submit(format!("{t}:{i}"), 1000).expect("accepted");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("producer thread panicked");
        }
        let mut last = [None::<u32>; 3];
        while let Some(uri) = queue.try_dequeue() {
            let (t, i) = uri.split_once(':').expect("formatted item");
            let t: usize = t.parse().expect("producer index");
            let i: u32 = i.parse().expect("sequence number");
            assert!(last[t].is_none_or(|prev| prev < i));
            last[t] = Some(i);
        }
    }
}
