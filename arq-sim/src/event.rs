//! Discrete event queue
//!
//! Events are ordered by time; events scheduled for the same instant come
//! out in the order they were pushed.

use crate::channel::Side;
use bytes::Bytes;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// Something that happens at a point in simulated time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The application at A hands over its next message
    FromApplication,
    /// An encoded packet reaches an endpoint
    Arrival { to: Side, frame: Bytes },
    /// An endpoint's alarm goes off; stale if the alarm was re-armed since
    TimerExpiry { side: Side, generation: u64 },
}

#[derive(Debug)]
struct Scheduled {
    at: Duration,
    order: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.order == other.order
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.order).cmp(&(other.at, other.order))
    }
}

/// Time-ordered queue of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_order: u64,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event
    pub fn push(&mut self, at: Duration, event: Event) {
        let order = self.next_order;
        self.next_order += 1;
        self.heap.push(Reverse(Scheduled { at, order, event }));
    }

    /// Remove the earliest event
    pub fn pop(&mut self) -> Option<(Duration, Event)> {
        self.heap.pop().map(|Reverse(s)| (s.at, s.event))
    }

    /// Time of the earliest event
    pub fn peek_time(&self) -> Option<Duration> {
        self.heap.peek().map(|Reverse(s)| s.at)
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
