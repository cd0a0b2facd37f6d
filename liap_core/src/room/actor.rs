use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, interval};

use crate::archival::ArchivalSink;
use crate::events::{ConnectionId, EventLog, EventLogConfig};
use crate::protocol::{OutboundEvent, WirePiece};
use crate::rules::{self, Piece, Play};

use super::entities::{Player, RoomConfig, RoomId, RoomSummary, Trick};
use super::messages::{RoomAction, RoomError, RoomMessage};
use super::phase::Phase;

/// Internal, in-process signal the bot driver subscribes to. Distinct from
/// the wire protocol: bots observe phase/turn transitions directly rather
/// than parsing their own outbound frames.
#[derive(Clone, Debug)]
pub enum RoomSignal {
    PhaseChanged { phase: Phase, phase_iteration: u64 },
    TurnStarted { seat: usize, phase_iteration: u64 },
    RedealOffered { seat: usize, phase_iteration: u64 },
}

/// Point-in-time game state visible to a single seat, handed to the bot
/// driver so it can decide without reaching into the actor directly.
#[derive(Clone, Debug)]
pub struct BotView {
    pub my_seat: usize,
    pub is_bot: bool,
    pub phase: Phase,
    pub hand: Vec<Piece>,
    pub is_my_turn: bool,
    pub lead_play: Option<Vec<Piece>>,
    pub declarations: [Option<i32>; 4],
    pub declared_count: usize,
    pub redeal_offered_to_me: bool,
}

/// Result of a `join_or_reconnect` request.
#[derive(Clone, Copy, Debug)]
pub struct JoinOutcome {
    pub seat: usize,
    pub reconnected: bool,
}

/// Lightweight, cloneable reference to a spawned room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    signal_tx: broadcast::Sender<RoomSignal>,
    pub room_id: RoomId,
    pub room_code: String,
}

impl RoomHandle {
    /// Non-blocking: a full inbound queue means the actor is overwhelmed, so
    /// the caller is rejected with `Busy` rather than backpressured.
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        use mpsc::error::TrySendError;
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RoomError::Busy),
            Err(TrySendError::Closed(_)) => Err(RoomError::InvariantViolation("room actor gone".into())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomSignal> {
        self.signal_tx.subscribe()
    }

    pub async fn dispatch_action(&self, seat: usize, action: RoomAction) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::Action { seat, action, response: tx }).await?;
        rx.await
            .map_err(|_| RoomError::InvariantViolation("room actor dropped response".into()))?
    }

    pub async fn summary(&self) -> Option<RoomSummary> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::GetSummary { response: tx }).await.ok()?;
        rx.await.ok()
    }

    pub async fn bot_view(&self, seat: usize) -> Option<BotView> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::BotView { seat, response: tx }).await.ok()?;
        rx.await.ok().flatten()
    }

    /// Binds a connection to a seat, flushing any events it missed while
    /// offline through the new channel.
    pub async fn connect(
        &self,
        seat: usize,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<crate::protocol::OutboundEnvelope>,
    ) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::Connect { seat, connection_id, outbound, response: tx }).await?;
        rx.await.map_err(|_| RoomError::InvariantViolation("room actor dropped response".into()))?
    }

    pub async fn disconnect(&self, seat: usize) {
        let _ = self.send(RoomMessage::Disconnect { seat }).await;
    }

    pub async fn ack(&self, connection_id: ConnectionId, sequence: u64) {
        let _ = self.send(RoomMessage::Ack { connection_id, sequence }).await;
    }

    pub async fn resync(&self, from_sequence: u64) -> Result<Vec<crate::events::Event>, crate::events::EventLogError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::Resync { from_sequence, response: tx })
            .await
            .map_err(|_| crate::events::EventLogError::UnknownConnection(0))?;
        rx.await.map_err(|_| crate::events::EventLogError::UnknownConnection(0))?
    }

    /// Join by name, or reconnect to an already-seated name. Routed through
    /// the actor's own mailbox so joins never race a concurrent action on
    /// the same room.
    pub async fn join_or_reconnect(&self, player_name: String) -> Result<JoinOutcome, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::JoinOrReconnect { player_name, response: tx }).await?;
        rx.await.map_err(|_| RoomError::InvariantViolation("room actor dropped response".into()))?
    }

    pub async fn add_bot(&self, issued_by_seat: usize) -> Result<usize, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::AddBot { issued_by_seat, response: tx }).await?;
        rx.await.map_err(|_| RoomError::InvariantViolation("room actor dropped response".into()))?
    }

    pub async fn remove_player(&self, issued_by_seat: usize, seat: usize) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::RemovePlayer { issued_by_seat, seat, response: tx }).await?;
        rx.await.map_err(|_| RoomError::InvariantViolation("room actor dropped response".into()))?
    }
}

/// The single logical writer for a room's mutable game state.
pub struct RoomActor {
    id: RoomId,
    code: String,
    config: RoomConfig,
    seats: [Option<Player>; 4],
    connection_seats: HashMap<ConnectionId, usize>,
    host_seat: usize,
    started: bool,
    phase: Phase,
    phase_iteration: u64,
    round_number: u32,
    turn_number: u32,
    starter_seat: usize,
    current_turn_seat: usize,
    trick: Trick,
    declarations: [Option<i32>; 4],
    pending_redeal_offers: VecDeque<usize>,
    active_redeal_offer_seat: Option<usize>,
    redeal_count_this_round: u32,
    ready_for_next_round: [bool; 4],
    invariant_violations: u32,
    created_at: chrono::DateTime<Utc>,
    deal_seed_base: u64,
    deal_seed_counter: u64,
    turn_results_deadline: Option<Instant>,
    inbox: mpsc::Receiver<RoomMessage>,
    event_log: EventLog,
    signal_tx: broadcast::Sender<RoomSignal>,
    archival: Arc<dyn ArchivalSink>,
}

impl RoomActor {
    pub fn spawn(
        room_code: String,
        host_name: String,
        config: RoomConfig,
        event_log_config: EventLogConfig,
        archival: Arc<dyn ArchivalSink>,
    ) -> RoomHandle {
        let (sender, inbox) = mpsc::channel(config.inbound_queue_size);
        let (signal_tx, _rx) = broadcast::channel(64);
        let id = uuid::Uuid::new_v4();
        let mut seats: [Option<Player>; 4] = Default::default();
        seats[0] = Some(Player::new_human(host_name, 0));

        let actor = Self {
            id,
            code: room_code.clone(),
            config,
            seats,
            connection_seats: HashMap::new(),
            host_seat: 0,
            started: false,
            phase: Phase::Lobby,
            phase_iteration: 0,
            round_number: 0,
            turn_number: 0,
            starter_seat: 0,
            current_turn_seat: 0,
            trick: Trick::default(),
            declarations: [None; 4],
            pending_redeal_offers: VecDeque::new(),
            active_redeal_offer_seat: None,
            redeal_count_this_round: 0,
            ready_for_next_round: [false; 4],
            invariant_violations: 0,
            created_at: Utc::now(),
            deal_seed_base: rand::random(),
            deal_seed_counter: 0,
            turn_results_deadline: None,
            inbox,
            event_log: EventLog::new(event_log_config),
            signal_tx: signal_tx.clone(),
            archival,
        };

        let handle = RoomHandle {
            sender,
            signal_tx,
            room_id: id,
            room_code,
        };
        tokio::spawn(actor.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!(room_id = %self.id, room_code = %self.code, "room starting");
        let mut tick_interval = interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(RoomMessage::Close { response }) => {
                            self.event_log.append(OutboundEvent::RoomClosed);
                            self.archive_on_close().await;
                            let _ = response.send(());
                            break;
                        }
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
                _ = tick_interval.tick() => {
                    self.on_tick();
                }
            }
        }
        tracing::info!(room_id = %self.id, room_code = %self.code, "room closed");
    }

    async fn archive_on_close(&mut self) {
        let summary = self.summary();
        let events = self.event_log.history().to_vec();
        self.archival.archive(summary, events).await;
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Action { seat, action, response } => {
                let result = self.handle_action(seat, action);
                if let Err(ref err) = result
                    && let Some(conn) = self.connection_for_seat(seat)
                {
                    self.event_log.send_direct(conn, OutboundEvent::ActionRejected { reason: err.to_string() });
                }
                let _ = response.send(result);
            }
            RoomMessage::Connect { seat, connection_id, outbound, response } => {
                let result = self.connect_seat(seat, connection_id, outbound);
                let _ = response.send(result);
            }
            RoomMessage::Disconnect { seat } => {
                self.disconnect_seat(seat);
                self.broadcast_room_update();
            }
            RoomMessage::Ack { connection_id, sequence } => {
                self.event_log.ack(connection_id, sequence);
            }
            RoomMessage::Resync { from_sequence, response } => {
                let result = self.resync(from_sequence);
                let _ = response.send(result);
            }
            RoomMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }
            RoomMessage::BotView { seat, response } => {
                let _ = response.send(self.bot_view(seat));
            }
            RoomMessage::JoinOrReconnect { player_name, response } => {
                let _ = response.send(self.join_or_reconnect(&player_name));
            }
            RoomMessage::AddBot { issued_by_seat, response } => {
                let _ = response.send(self.add_bot(issued_by_seat));
            }
            RoomMessage::RemovePlayer { issued_by_seat, seat, response } => {
                let _ = response.send(self.remove_player(issued_by_seat, seat));
            }
            RoomMessage::Close { .. } => unreachable!("handled in run()"),
            RoomMessage::Tick => self.on_tick(),
        }
    }

    fn connection_for_seat(&self, seat: usize) -> Option<ConnectionId> {
        self.connection_seats.iter().find(|&(_, &s)| s == seat).map(|(id, _)| *id)
    }

    fn connect_seat(
        &mut self,
        seat: usize,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<crate::protocol::OutboundEnvelope>,
    ) -> Result<(), RoomError> {
        if seat >= 4 || self.seats[seat].is_none() {
            return Err(RoomError::SeatVacant);
        }
        self.event_log
            .bind(seat, connection_id, outbound)
            .map_err(|e| RoomError::InvariantViolation(e.to_string()))?;
        self.connection_seats.insert(connection_id, seat);
        if let Some(player) = &mut self.seats[seat] {
            player.mark_reconnected();
        }
        self.broadcast_room_update();
        Ok(())
    }

    fn disconnect_seat(&mut self, seat: usize) {
        if let Some(player) = &mut self.seats[seat] {
            player.mark_disconnected();
        }
        self.event_log.unbind(seat);
        self.connection_seats.retain(|_, &mut s| s != seat);
    }

    fn resync(&self, from_sequence: u64) -> Result<Vec<crate::events::Event>, crate::events::EventLogError> {
        match self.event_log.resync(from_sequence) {
            Ok(events) => Ok(events),
            Err(crate::events::EventLogError::ResyncTooOld { .. }) => {
                let snapshot = self.snapshot_event();
                let mut events = vec![snapshot.clone()];
                events.extend(self.event_log.ring_tail(snapshot.sequence));
                Ok(events)
            }
            Err(other) => Err(other),
        }
    }

    /// A synthesized catch-up event standing in for everything the ring has
    /// already evicted. Its sequence sits one below the ring's floor so it
    /// never collides with (and is never skipped by) the real events that
    /// follow it.
    fn snapshot_event(&self) -> crate::events::Event {
        crate::events::Event {
            sequence: self.event_log.ring_floor().saturating_sub(1),
            payload: OutboundEvent::PhaseChange {
                phase: self.phase.as_wire_str().into(),
                phase_data: self.phase_snapshot(),
            },
            timestamp: Utc::now(),
        }
    }

    fn bot_view(&self, seat: usize) -> Option<BotView> {
        let player = self.seats[seat].as_ref()?;
        Some(BotView {
            my_seat: seat,
            is_bot: player.is_bot,
            phase: self.phase,
            hand: player.hand.pieces().to_vec(),
            is_my_turn: self.current_turn_seat == seat
                && matches!(self.phase, Phase::Declaration | Phase::Turn),
            lead_play: self.trick.lead_play().map(|p| p.pieces().to_vec()),
            declarations: self.declarations,
            declared_count: self.declarations.iter().filter(|d| d.is_some()).count(),
            redeal_offered_to_me: self.active_redeal_offer_seat == Some(seat),
        })
    }

    fn summary(&self) -> RoomSummary {
        let host_name = self.seats[self.host_seat]
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        RoomSummary {
            room_id: self.id,
            room_code: self.code.clone(),
            host_name,
            occupied: self.seats.iter().filter(|s| s.is_some()).count(),
            total: 4,
            started: self.started,
            phase: self.phase,
            created_at: self.created_at,
        }
    }

    // ---- seating ----------------------------------------------------

    pub fn join_or_reconnect(&mut self, player_name: &str) -> Result<JoinOutcome, RoomError> {
        if let Some(seat) = (0..4).find(|&i| self.seats[i].as_ref().map(|p| p.name == player_name).unwrap_or(false)) {
            return Ok(JoinOutcome { seat, reconnected: true });
        }
        let seat = (0..4)
            .find(|&i| self.seats[i].is_none())
            .ok_or(RoomError::InvariantViolation("ROOM_FULL".into()))?;
        self.seats[seat] = Some(Player::new_human(player_name.to_string(), seat));
        self.recompute_host();
        self.broadcast_room_update();
        Ok(JoinOutcome { seat, reconnected: false })
    }

    pub fn add_bot(&mut self, issued_by_seat: usize) -> Result<usize, RoomError> {
        if issued_by_seat != self.host_seat {
            return Err(RoomError::NotHost);
        }
        let seat = (0..4)
            .find(|&i| self.seats[i].is_none())
            .ok_or(RoomError::InvariantViolation("ROOM_FULL".into()))?;
        self.seats[seat] = Some(Player::new_bot(seat));
        self.broadcast_room_update();
        Ok(seat)
    }

    pub fn remove_player(&mut self, issued_by_seat: usize, seat: usize) -> Result<(), RoomError> {
        if issued_by_seat != self.host_seat {
            return Err(RoomError::NotHost);
        }
        if self.started {
            return Err(RoomError::WrongPhase);
        }
        self.seats[seat] = None;
        self.connection_seats.retain(|_, &mut s| s != seat);
        self.recompute_host();
        self.broadcast_room_update();
        Ok(())
    }

    fn recompute_host(&mut self) {
        if let Some(seat) = (0..4).find(|&i| self.seats[i].as_ref().map(|p| !p.original_is_bot).unwrap_or(false)) {
            self.host_seat = seat;
        }
    }

    fn broadcast_room_update(&mut self) {
        let seats = self
            .seats
            .iter()
            .map(|slot| {
                slot.as_ref().map(|p| crate::protocol::SeatView {
                    name: p.name.clone(),
                    is_bot: p.is_bot,
                    is_connected: p.is_connected,
                })
            })
            .collect();
        self.event_log.append(OutboundEvent::RoomUpdate {
            seats,
            host: self.host_seat,
            started: self.started,
        });
    }

    // ---- action dispatch ---------------------------------------------

    fn handle_action(&mut self, seat: usize, action: RoomAction) -> Result<(), RoomError> {
        if seat >= 4 {
            return Err(RoomError::SeatVacant);
        }
        match action {
            RoomAction::StartGame => self.handle_start_game(seat),
            RoomAction::AcceptRedeal => self.handle_redeal_decision(seat, true),
            RoomAction::DeclineRedeal => self.handle_redeal_decision(seat, false),
            RoomAction::Declare { value } => self.handle_declare(seat, value),
            RoomAction::Play { pieces } => self.handle_play(seat, pieces),
            RoomAction::LeaveGame => self.handle_leave_game(seat),
            RoomAction::PlayerReady => self.handle_player_ready(seat),
        }
    }

    fn handle_start_game(&mut self, seat: usize) -> Result<(), RoomError> {
        if seat != self.host_seat {
            return Err(RoomError::NotHost);
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::WrongPhase);
        }
        if self.seats.iter().any(|s| s.is_none()) {
            return Err(RoomError::NotFull);
        }
        self.started = true;
        self.round_number = 1;
        self.begin_round();
        Ok(())
    }

    fn handle_redeal_decision(&mut self, seat: usize, accept: bool) -> Result<(), RoomError> {
        if self.phase != Phase::Preparation {
            return Err(RoomError::WrongPhase);
        }
        if self.active_redeal_offer_seat != Some(seat) {
            return Err(RoomError::NoRedealOffered);
        }
        self.active_redeal_offer_seat = None;
        self.pending_redeal_offers.pop_front();
        self.event_log.append(OutboundEvent::RedealDecided { seat, accepted: accept });
        if accept && self.redeal_count_this_round < self.config.redeal_cap {
            self.redeal_count_this_round += 1;
            self.pending_redeal_offers.clear();
            self.redeal_hands();
        }
        self.advance_preparation();
        Ok(())
    }

    fn handle_declare(&mut self, seat: usize, value: i32) -> Result<(), RoomError> {
        if self.phase != Phase::Declaration {
            return Err(RoomError::WrongPhase);
        }
        if seat != self.current_turn_seat {
            return Err(RoomError::NotYourTurn);
        }
        if !(0..=8).contains(&value) {
            return Err(RoomError::IllegalDeclaration);
        }
        let declared_count = self.declarations.iter().filter(|d| d.is_some()).count();
        if declared_count == 3 {
            let sum: i32 = self.declarations.iter().filter_map(|d| *d).sum::<i32>() + value;
            if sum == 8 {
                return Err(RoomError::IllegalDeclaration);
            }
        }
        self.declarations[seat] = Some(value);
        if let Some(player) = &mut self.seats[seat] {
            player.declared_piles = Some(value);
        }
        self.event_log.append(OutboundEvent::DeclarationMade { seat, value });
        self.current_turn_seat = (self.current_turn_seat + 1) % 4;
        if self.declarations.iter().all(|d| d.is_some()) {
            self.begin_turn_phase();
        } else {
            self.emit_turn_started();
        }
        Ok(())
    }

    fn handle_play(&mut self, seat: usize, pieces: Vec<Piece>) -> Result<(), RoomError> {
        if self.phase != Phase::Turn {
            return Err(RoomError::WrongPhase);
        }
        if seat != self.current_turn_seat {
            return Err(RoomError::NotYourTurn);
        }
        let play = Play::new(pieces).map_err(|_| RoomError::IllegalPlay)?;
        let player = self.seats[seat].as_ref().ok_or(RoomError::SeatVacant)?;

        if self.trick.plays.is_empty() {
            if rules::classify(&play).is_none() || !player.hand.contains_all(play.pieces()) {
                return Err(RoomError::IllegalPlay);
            }
        } else {
            let lead = self.trick.lead_play().expect("lead present when plays non-empty").clone();
            if !rules::legal_follow(&play, &lead, &player.hand) {
                return Err(RoomError::IllegalPlay);
            }
        }

        let played_pieces = play.pieces().to_vec();
        if let Some(player) = &mut self.seats[seat] {
            player.hand.remove(&played_pieces);
        }
        self.trick.plays.push((seat, play));
        self.event_log.append(OutboundEvent::PlayMade {
            seat,
            pieces: played_pieces.into_iter().map(WirePiece::from).collect(),
        });

        if self.trick.is_complete() {
            self.resolve_trick();
        } else {
            self.current_turn_seat = (self.current_turn_seat + 1) % 4;
            self.emit_turn_started();
        }
        Ok(())
    }

    fn handle_leave_game(&mut self, seat: usize) -> Result<(), RoomError> {
        if self.seats[seat].is_none() {
            return Err(RoomError::SeatVacant);
        }
        self.event_log.unbind(seat);
        self.connection_seats.retain(|_, &mut s| s != seat);
        if !self.started {
            self.seats[seat] = None;
            self.recompute_host();
        } else {
            if let Some(player) = &mut self.seats[seat] {
                player.mark_disconnected();
            }
            self.event_log.append(OutboundEvent::PlayerLeft { seat });
        }
        self.broadcast_room_update();
        Ok(())
    }

    fn handle_player_ready(&mut self, seat: usize) -> Result<(), RoomError> {
        if self.phase != Phase::Scoring {
            return Err(RoomError::WrongPhase);
        }
        self.ready_for_next_round[seat] = true;
        if self.ready_for_next_round.iter().all(|&r| r) {
            self.round_number += 1;
            self.begin_round();
        }
        Ok(())
    }

    // ---- phase progression ---------------------------------------------

    fn next_deal_seed(&mut self) -> u64 {
        self.deal_seed_counter += 1;
        self.deal_seed_base ^ self.deal_seed_counter
    }

    fn begin_round(&mut self) {
        let seed = self.next_deal_seed();
        let hands = rules::deal(seed);
        if self.round_number == 1 {
            self.starter_seat = rules::red_general_holder(&hands);
        }
        for (i, hand) in hands.into_iter().enumerate() {
            if let Some(player) = &mut self.seats[i] {
                player.reset_for_round();
                player.hand = hand;
            }
        }
        self.redeal_count_this_round = 0;
        self.turn_number = 0;
        self.current_turn_seat = self.starter_seat;
        self.enter_phase(Phase::Preparation);
        self.emit_hand_dealt_private();
        self.pending_redeal_offers = (0..4)
            .filter(|&seat| self.seats[seat].as_ref().map(|p| rules::is_weak(&p.hand)).unwrap_or(false))
            .collect();
        self.advance_preparation();
    }

    fn redeal_hands(&mut self) {
        let seed = self.next_deal_seed();
        let hands = rules::deal(seed);
        for (i, hand) in hands.into_iter().enumerate() {
            if let Some(player) = &mut self.seats[i] {
                player.hand = hand;
                player.declared_piles = None;
                player.captured_piles_this_round = 0;
            }
        }
        self.emit_hand_dealt_private();
        self.pending_redeal_offers = (0..4)
            .filter(|&seat| self.seats[seat].as_ref().map(|p| rules::is_weak(&p.hand)).unwrap_or(false))
            .collect();
    }

    fn emit_hand_dealt_private(&mut self) {
        for seat in 0..4 {
            if let Some(player) = &self.seats[seat] {
                let hand: Vec<WirePiece> = player.hand.pieces().iter().copied().map(WirePiece::from).collect();
                let _ = self.event_log.append_private(seat, OutboundEvent::HandDealt { hand });
            }
        }
    }

    fn advance_preparation(&mut self) {
        if let Some(&next_seat) = self.pending_redeal_offers.front() {
            self.active_redeal_offer_seat = Some(next_seat);
            self.event_log.append(OutboundEvent::RedealOffered { seat: next_seat });
            let _ = self.signal_tx.send(RoomSignal::RedealOffered {
                seat: next_seat,
                phase_iteration: self.phase_iteration,
            });
        } else {
            self.active_redeal_offer_seat = None;
            self.declarations = [None; 4];
            self.current_turn_seat = self.starter_seat;
            self.enter_phase(Phase::Declaration);
            self.emit_turn_started();
        }
    }

    fn begin_turn_phase(&mut self) {
        self.current_turn_seat = self.starter_seat;
        self.trick = Trick::new(self.starter_seat);
        self.enter_phase(Phase::Turn);
        self.emit_turn_started();
    }

    fn resolve_trick(&mut self) {
        let lead_play = self.trick.plays[0].1.clone();
        let lead_type = rules::classify(&lead_play);
        let mut best: Option<(usize, i32, i32)> = None;
        for (seat, play) in &self.trick.plays {
            if rules::classify(play) != lead_type {
                continue;
            }
            let strength = rules::strength(play).unwrap_or(i32::MIN);
            let point_sum = rules::point_sum(play);
            let is_better = match best {
                None => true,
                Some((_, best_strength, best_points)) => (strength, point_sum) > (best_strength, best_points),
            };
            if is_better {
                best = Some((*seat, strength, point_sum));
            }
        }
        let winner = best.map(|(seat, _, _)| seat).unwrap_or(self.trick.lead_seat);
        let pile_count = self.trick.plays.len() as u32;
        let mut piles_won = [0u32; 4];
        piles_won[winner] = pile_count;
        match &mut self.seats[winner] {
            Some(player) => player.captured_piles_this_round += pile_count,
            None => self.record_invariant_violation(format!("trick winner seat {winner} is vacant")),
        }
        self.turn_number += 1;
        let winning_play = self
            .trick
            .plays
            .iter()
            .find(|(seat, _)| *seat == winner)
            .map(|(_, play)| play.pieces().iter().copied().map(WirePiece::from).collect())
            .unwrap_or_default();

        self.starter_seat = winner;
        self.event_log.append(OutboundEvent::TurnResolved {
            winner,
            winning_play,
            piles_won_this_turn: piles_won,
            next_starter: winner,
            turn_number: self.turn_number,
        });
        self.enter_phase(Phase::TurnResults);
        self.turn_results_deadline = Some(Instant::now() + self.config.turn_results_display);
    }

    fn begin_scoring_phase(&mut self) {
        let declared: [i32; 4] = std::array::from_fn(|i| self.seats[i].as_ref().and_then(|p| p.declared_piles).unwrap_or(0));
        let captured: [i32; 4] = std::array::from_fn(|i| self.seats[i].as_ref().map(|p| p.captured_piles_this_round as i32).unwrap_or(0));
        let delta = rules::score_round(declared, captured);
        for i in 0..4 {
            if let Some(player) = &mut self.seats[i] {
                player.cumulative_score += delta[i];
            }
        }
        let cumulative: [i32; 4] = std::array::from_fn(|i| self.seats[i].as_ref().map(|p| p.cumulative_score).unwrap_or(0));
        self.enter_phase(Phase::Scoring);
        self.event_log.append(OutboundEvent::RoundScored { per_seat_delta: delta, cumulative });
        self.ready_for_next_round = [false; 4];

        if let Some((winner, _)) = cumulative.iter().enumerate().filter(|&(_, &s)| s >= self.config.win_threshold).max_by_key(|&(_, &s)| s) {
            self.event_log.append(OutboundEvent::GameEnded { winner, final_scores: cumulative });
            self.enter_phase(Phase::GameOver);
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_iteration += 1;
        let phase_data = self.phase_snapshot();
        self.event_log.append(OutboundEvent::PhaseChange {
            phase: phase.as_wire_str().into(),
            phase_data,
        });
        let _ = self.signal_tx.send(RoomSignal::PhaseChanged { phase, phase_iteration: self.phase_iteration });
    }

    fn emit_turn_started(&mut self) {
        let _ = self.signal_tx.send(RoomSignal::TurnStarted {
            seat: self.current_turn_seat,
            phase_iteration: self.phase_iteration,
        });
    }

    fn phase_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "round_number": self.round_number,
            "starter_seat": self.starter_seat,
            "current_turn_seat": self.current_turn_seat,
            "turn_number": self.turn_number,
        })
    }

    fn record_invariant_violation(&mut self, reason: String) {
        self.invariant_violations += 1;
        self.event_log.append(OutboundEvent::RoomError { reason });
        if self.invariant_violations >= 3 {
            let cumulative: [i32; 4] = std::array::from_fn(|i| self.seats[i].as_ref().map(|p| p.cumulative_score).unwrap_or(0));
            self.event_log.append(OutboundEvent::GameEnded { winner: self.host_seat, final_scores: cumulative });
            self.enter_phase(Phase::GameOver);
        }
    }

    fn on_tick(&mut self) {
        if self.phase == Phase::TurnResults
            && let Some(deadline) = self.turn_results_deadline
            && Instant::now() >= deadline
        {
            self.turn_results_deadline = None;
            let hands_nonempty = self.seats.iter().any(|p| p.as_ref().map(|pl| !pl.hand.is_empty()).unwrap_or(false));
            if hands_nonempty {
                self.begin_turn_phase();
            } else {
                self.begin_scoring_phase();
            }
        }

        for dead in self.event_log.retransmit_due() {
            if let Some(&seat) = self.connection_seats.get(&dead) {
                self.event_log.drop_connection(dead);
                self.disconnect_seat(seat);
                self.broadcast_room_update();
            }
        }
    }
}
