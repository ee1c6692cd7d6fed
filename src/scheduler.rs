//! Timer scheduling over a virtual clock.
//!
//! Periodic tasks never capture closures. Each scheduled item is a plain
//! [`TimerEvent`] that the owning service dispatches when it falls due, so
//! task bodies stay pure step functions over the service state.

use crate::types::EntityId;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle returned by [`Scheduler::schedule_after`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Ask the host to retry a blocked departure.
    EgressRetry(EntityId),
    /// Re-level a ship to the tide.
    TideTick(EntityId),
    /// Draw zone annotations to the live-view subscribers.
    ViewerTick,
}

pub trait Scheduler {
    /// Current virtual time.
    fn now(&self) -> Duration;
    fn schedule_after(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;
    /// Returns whether the timer was still pending. Cancelling twice is fine.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

/// Deadline-ordered queue of pending events.
///
/// Ties on the deadline fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_handle: u64,
    queue: BTreeMap<(Duration, u64), TimerEvent>,
    deadlines: HashMap<u64, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Deadline of the earliest pending event.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest event due at or before `until`, moving the clock to
    /// its deadline. Callers loop on this so events scheduled while firing
    /// are honoured in the same advance.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerHandle, TimerEvent)> {
        let (&(due, seq), _) = self.queue.iter().next()?;
        if due > until {
            return None;
        }
        let event = self.queue.remove(&(due, seq))?;
        self.deadlines.remove(&seq);
        self.now = self.now.max(due);
        Some((TimerHandle(seq), event))
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}

impl Scheduler for TimerQueue {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule_after(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let seq = self.next_handle;
        self.next_handle += 1;
        let due = self.now + delay;
        self.queue.insert((due, seq), event);
        self.deadlines.insert(seq, due);
        TimerHandle(seq)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(due) => self.queue.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }
}
