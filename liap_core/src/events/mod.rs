//! Per-room event log: totally-ordered publication, at-least-once delivery,
//! and gap-detectable resync.
//!
//! Owns nothing about game state. The room actor decides *what* happened and
//! *who* should see it; this module is purely responsible for numbering,
//! buffering, fanning out, and retransmitting.

mod offline_queue;
mod ring;

pub use offline_queue::OfflineQueue;
pub use ring::EventRing;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{OutboundEnvelope, OutboundEvent};

pub type ConnectionId = Uuid;

/// A single published event. Immutable once appended.
#[derive(Clone, Debug)]
pub struct Event {
    pub sequence: u64,
    pub payload: OutboundEvent,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Critical events (phase changes, scoring, game end, turn resolution)
    /// are never dropped by the offline queue's overflow policy.
    pub fn is_critical(&self) -> bool {
        matches!(
            self.payload,
            OutboundEvent::PhaseChange { .. }
                | OutboundEvent::RoundScored { .. }
                | OutboundEvent::GameEnded { .. }
                | OutboundEvent::TurnResolved { .. }
        )
    }

    fn to_envelope(&self) -> OutboundEnvelope {
        OutboundEnvelope::new(self.payload.clone(), Some(self.sequence))
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("requested resync from {from_seq}, below the ring floor {floor}")]
    ResyncTooOld { from_seq: u64, floor: u64 },
    #[error("no connection bound for seat {0}")]
    UnknownConnection(usize),
    #[error("seat index {0} out of range")]
    InvalidSeat(usize),
}

/// Per-connection outbound state: the channel writes land on, and the set of
/// events sent but not yet acked.
struct ConnectionState {
    outbound: mpsc::Sender<OutboundEnvelope>,
    pending_ack: HashMap<u64, PendingEntry>,
}

struct PendingEntry {
    event: Event,
    last_sent_at: Instant,
    attempts: u32,
}

/// Where a seat's events currently go: a live connection, or an offline
/// queue while the seat is bot-controlled because its human disconnected.
enum SeatBinding {
    Connected(ConnectionId),
    Offline,
}

/// Config knobs carried from `liap_server::config`, defaulted for
/// stand-alone `liap_core` use (e.g. in tests).
#[derive(Clone, Copy, Debug)]
pub struct EventLogConfig {
    pub ring_capacity: usize,
    pub offline_queue_capacity: usize,
    pub retransmit_timeout: Duration,
    pub retransmit_limit: u32,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1000,
            offline_queue_capacity: 200,
            retransmit_timeout: Duration::from_secs(2),
            retransmit_limit: 5,
        }
    }
}

/// The event log and delivery state for a single room.
pub struct EventLog {
    config: EventLogConfig,
    ring: EventRing,
    next_sequence: u64,
    seat_bindings: [SeatBinding; 4],
    offline_queues: [OfflineQueue; 4],
    connections: HashMap<ConnectionId, ConnectionState>,
    /// Unbounded append-only record of every event this room has ever
    /// published, handed to the archival collaborator on room close. Not
    /// used for delivery or resync — `ring` serves that.
    history: Vec<Event>,
}

impl EventLog {
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            ring: EventRing::new(config.ring_capacity),
            next_sequence: 1,
            seat_bindings: [
                SeatBinding::Offline,
                SeatBinding::Offline,
                SeatBinding::Offline,
                SeatBinding::Offline,
            ],
            offline_queues: std::array::from_fn(|_| OfflineQueue::new(config.offline_queue_capacity)),
            connections: HashMap::new(),
            history: Vec::new(),
            config,
        }
    }

    /// Every event this room has published, in sequence order. Consumed by
    /// the archival collaborator when the room closes.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// Binds a seat to a live connection. Flushes the seat's offline queue
    /// through the new connection in sequence order, then removes it.
    pub fn bind(&mut self, seat: usize, connection_id: ConnectionId, outbound: mpsc::Sender<OutboundEnvelope>) -> Result<(), EventLogError> {
        if seat >= 4 {
            return Err(EventLogError::InvalidSeat(seat));
        }
        self.connections.insert(
            connection_id,
            ConnectionState {
                outbound: outbound.clone(),
                pending_ack: HashMap::new(),
            },
        );
        for event in self.offline_queues[seat].drain() {
            self.send_to_connection(connection_id, &event);
        }
        self.seat_bindings[seat] = SeatBinding::Connected(connection_id);
        Ok(())
    }

    /// Unbinds a seat, e.g. on disconnect. Subsequent broadcasts to this
    /// seat land in its offline queue instead.
    pub fn unbind(&mut self, seat: usize) {
        if let SeatBinding::Connected(id) = &self.seat_bindings[seat] {
            self.connections.remove(id);
        }
        self.seat_bindings[seat] = SeatBinding::Offline;
    }

    pub fn drop_connection(&mut self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        for binding in &mut self.seat_bindings {
            if let SeatBinding::Connected(id) = binding
                && *id == connection_id
            {
                *binding = SeatBinding::Offline;
            }
        }
    }

    /// Assigns the next sequence number, stores the event in the bounded
    /// ring, and broadcasts it to every seat.
    #[tracing::instrument(skip(self, payload))]
    pub fn append(&mut self, payload: OutboundEvent) -> u64 {
        let event = self.make_event(payload);
        let sequence = event.sequence;
        self.ring.push(event.clone());
        for seat in 0..4 {
            self.deliver_to_seat(seat, &event);
        }
        sequence
    }

    /// Delivers an event to exactly one seat (e.g. `hand_dealt`), without
    /// broadcasting to the rest of the room. Still occupies a sequence slot
    /// so gap detection stays consistent for that seat.
    pub fn append_private(&mut self, seat: usize, payload: OutboundEvent) -> Result<u64, EventLogError> {
        if seat >= 4 {
            return Err(EventLogError::InvalidSeat(seat));
        }
        let event = self.make_event(payload);
        let sequence = event.sequence;
        self.deliver_to_seat(seat, &event);
        Ok(sequence)
    }

    /// Sends a message to exactly one connection without assigning a
    /// sequence number or storing it in the ring — used for
    /// `action_rejected`, which is never part of the replayable log.
    pub fn send_direct(&mut self, connection_id: ConnectionId, payload: OutboundEvent) {
        if let Some(conn) = self.connections.get(&connection_id) {
            let _ = conn.outbound.try_send(OutboundEnvelope::new(payload, None));
        }
    }

    fn make_event(&mut self, payload: OutboundEvent) -> Event {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let event = Event {
            sequence,
            payload,
            timestamp: Utc::now(),
        };
        self.history.push(event.clone());
        event
    }

    fn deliver_to_seat(&mut self, seat: usize, event: &Event) {
        match &self.seat_bindings[seat] {
            SeatBinding::Connected(id) => {
                let id = *id;
                self.send_to_connection(id, event);
            }
            SeatBinding::Offline => {
                self.offline_queues[seat].push(event.clone());
            }
        }
    }

    fn send_to_connection(&mut self, connection_id: ConnectionId, event: &Event) {
        if let Some(conn) = self.connections.get_mut(&connection_id) {
            let _ = conn.outbound.try_send(event.to_envelope());
            conn.pending_ack.insert(
                event.sequence,
                PendingEntry {
                    event: event.clone(),
                    last_sent_at: Instant::now(),
                    attempts: 1,
                },
            );
        }
    }

    /// Removes all pending entries with sequence <= `ack`. Double-acking is
    /// a no-op since removal of an absent key is a no-op.
    pub fn ack(&mut self, connection_id: ConnectionId, sequence: u64) {
        if let Some(conn) = self.connections.get_mut(&connection_id) {
            conn.pending_ack.retain(|&seq, _| seq > sequence);
        }
    }

    /// Returns the tail of the ring from `from_sequence + 1` onward, or
    /// `ResyncTooOld` if that sequence has already fallen off the ring.
    pub fn resync(&self, from_sequence: u64) -> Result<Vec<Event>, EventLogError> {
        let floor = self.ring.floor();
        if from_sequence < floor {
            return Err(EventLogError::ResyncTooOld {
                from_seq: from_sequence,
                floor,
            });
        }
        Ok(self
            .ring
            .iter()
            .filter(|e| e.sequence > from_sequence)
            .cloned()
            .collect())
    }

    /// Re-sends pending events older than the retransmit timeout. Returns
    /// the connections that exceeded the retransmit limit and should be
    /// closed as dead.
    pub fn retransmit_due(&mut self) -> Vec<ConnectionId> {
        let mut dead = Vec::new();
        let timeout = self.config.retransmit_timeout;
        let limit = self.config.retransmit_limit;
        for (&connection_id, conn) in self.connections.iter_mut() {
            let mut exceeded = false;
            for entry in conn.pending_ack.values_mut() {
                if entry.last_sent_at.elapsed() < timeout {
                    continue;
                }
                if entry.attempts >= limit {
                    exceeded = true;
                    continue;
                }
                let _ = conn.outbound.try_send(entry.event.to_envelope());
                entry.last_sent_at = Instant::now();
                entry.attempts += 1;
            }
            if exceeded {
                dead.push(connection_id);
            }
        }
        dead
    }

    pub fn current_sequence(&self) -> u64 {
        self.next_sequence.saturating_sub(1)
    }

    /// Lowest sequence number still retained by the ring. `0` if the ring is
    /// empty.
    pub fn ring_floor(&self) -> u64 {
        self.ring.floor()
    }

    /// The ring's retained events with `sequence > after`. Used to follow a
    /// synthesized snapshot event when a resync request falls below the ring
    /// floor, without re-sending events the snapshot already covers.
    pub fn ring_tail(&self, after: u64) -> Vec<Event> {
        self.ring.iter().filter(|e| e.sequence > after).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> EventLog {
        EventLog::new(EventLogConfig {
            ring_capacity: 4,
            offline_queue_capacity: 2,
            retransmit_timeout: Duration::from_millis(10),
            retransmit_limit: 2,
        })
    }

    #[test]
    fn append_assigns_monotonic_sequences() {
        let mut log = log();
        let a = log.append(OutboundEvent::Pong);
        let b = log.append(OutboundEvent::Pong);
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn resync_too_old_once_ring_evicts() {
        let mut log = log();
        for _ in 0..10 {
            log.append(OutboundEvent::Pong);
        }
        assert!(matches!(
            log.resync(1),
            Err(EventLogError::ResyncTooOld { .. })
        ));
        assert!(log.resync(8).is_ok());
    }

    #[test]
    fn double_ack_is_a_no_op() {
        let mut log = log();
        let (tx, _rx) = mpsc::channel(8);
        let conn = Uuid::new_v4();
        log.bind(0, conn, tx).unwrap();
        let seq = log.append(OutboundEvent::Pong);
        log.ack(conn, seq);
        log.ack(conn, seq);
        let conn_state = log.connections.get(&conn).unwrap();
        assert!(conn_state.pending_ack.is_empty());
    }

    #[test]
    fn offline_seat_receives_events_then_drains_on_bind() {
        let mut log = log();
        log.append(OutboundEvent::Pong);
        assert_eq!(log.offline_queues[0].len(), 1);
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Uuid::new_v4();
        log.bind(0, conn, tx).unwrap();
        assert_eq!(log.offline_queues[0].len(), 0);
        assert!(rx.try_recv().is_ok());
    }
}
