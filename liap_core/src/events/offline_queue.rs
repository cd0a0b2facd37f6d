use std::collections::VecDeque;

use super::Event;

/// Bounded per-(room, seat) buffer of events accumulated while the seat's
/// original human is disconnected. On overflow, the oldest non-critical
/// event is dropped first; critical kinds (phase changes, scoring, game
/// end, turn resolution) are retained preferentially.
pub struct OfflineQueue {
    events: VecDeque<Event>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn push(&mut self, event: Event) {
        if self.events.len() >= self.capacity {
            match self.events.iter().position(|e| !e.is_critical()) {
                Some(idx) => {
                    self.events.remove(idx);
                }
                None => {
                    // every queued event is critical; the bound still wins.
                    self.events.pop_front();
                }
            }
        }
        self.events.push_back(event);
    }

    /// Drains the queue in sequence order for flush-on-reconnect.
    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}
