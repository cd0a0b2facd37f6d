use std::collections::VecDeque;

use super::Event;

/// A bounded ring of the last `capacity` events appended to a room. Oldest
/// events fall off the back once capacity is reached, regardless of
/// criticality — the ring is a replay buffer, not a delivery guarantee
/// (that's [`super::OfflineQueue`]'s job).
pub struct EventRing {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Lowest sequence number still present in the ring. `0` means the ring
    /// is empty and every sequence is reachable.
    pub fn floor(&self) -> u64 {
        self.events.front().map(|e| e.sequence).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}
