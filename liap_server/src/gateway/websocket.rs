use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Notify;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use liap_core::events::ConnectionId;
use liap_core::protocol::{InboundEnvelope, InboundEvent, OutboundEnvelope, OutboundEvent};
use liap_core::room::{RoomAction, RoomHandle};
use tokio::sync::mpsc;
use tokio::time::interval;

use super::rate_limiter::RateLimiter;
use crate::api::AppState;
use crate::{logging, metrics};

/// Per-connection session state: which seat (if any) this socket currently
/// speaks for, and the outbound channel the room actor pushes events into.
struct Session {
    connection_id: ConnectionId,
    room: Option<RoomHandle>,
    seat: Option<usize>,
    outbound: mpsc::Sender<OutboundEnvelope>,
    rate_limiter: RateLimiter,
    /// Fired when the outbound queue overflows, so the read loop can close
    /// the connection instead of leaving a slow client silently behind.
    force_close: Arc<Notify>,
}

impl Session {
    fn send(&self, event: OutboundEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.outbound.try_send(OutboundEnvelope::new(event, None))
        {
            self.force_close.notify_one();
        }
    }

    fn send_error(&self, reason: impl std::fmt::Display) {
        self.send(OutboundEvent::Error { reason: reason.to_string() });
    }
}

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new_v4();
    let _guard = state.registry.register();
    logging::log_connection_event("connected", None, None);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundEnvelope>(state.config.outbound_queue_size);
    let last_seen = Arc::new(Mutex::new(Instant::now()));
    let force_close = Arc::new(Notify::new());

    let heartbeat_interval = state.config.heartbeat_interval;
    let idle_disconnect = state.config.idle_disconnect;
    let send_last_seen = last_seen.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ticker = interval(heartbeat_interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let idle = send_last_seen.lock().expect("lock poisoned").elapsed();
                    if idle > idle_disconnect {
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                maybe_envelope = outbound_rx.recv() => {
                    match maybe_envelope {
                        Some(envelope) => {
                            let json = serde_json::to_string(&envelope).expect("envelope always serializes");
                            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                            metrics::websocket_messages_sent();
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let mut session = Session {
        connection_id,
        room: None,
        seat: None,
        outbound: outbound_tx,
        rate_limiter: RateLimiter::new(state.config.rate_limit.capacity, state.config.rate_limit.refill_per_sec),
        force_close: force_close.clone(),
    };
    let mut lobby_rx = state.room_manager.subscribe_lobby();

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let Some(frame) = frame else { break };
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(_) => break,
                };
                *last_seen.lock().expect("lock poisoned") = Instant::now();
                match frame {
                    Message::Text(text) => {
                        metrics::websocket_messages_received();
                        if !session.rate_limiter.check() {
                            metrics::rate_limit_hits_total("ws");
                            session.send_error("RATE_LIMITED");
                            continue;
                        }
                        handle_inbound_text(&text, &mut session, &state).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = force_close.notified() => {
                logging::log_connection_event("closed_slow_consumer", None, session.seat);
                break;
            }
            // Only the lobby (not yet in a room) cares about the live room
            // list; a seated connection gets its state from its own room.
            result = lobby_rx.recv(), if session.room.is_none() => {
                if result.is_ok() {
                    let rooms = state.room_manager.list_rooms().await;
                    session.send(OutboundEvent::RoomListUpdate { rooms });
                }
            }
        }
    }

    if let (Some(room), Some(seat)) = (session.room.take(), session.seat.take()) {
        room.disconnect(seat).await;
    }
    send_task.abort();
    logging::log_connection_event("disconnected", None, session.seat);
}

async fn handle_inbound_text(text: &str, session: &mut Session, state: &AppState) {
    let envelope: InboundEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            session.send_error(format!("INVALID_MESSAGE: {err}"));
            return;
        }
    };

    if let (Some(seq), Some(room)) = (envelope.ack, session.room.clone()) {
        room.ack(session.connection_id, seq).await;
    }

    match envelope.event {
        InboundEvent::CreateRoom { player_name } => handle_create_room(session, state, player_name).await,
        InboundEvent::JoinRoom { room_code, player_name } => handle_join_room(session, state, room_code, player_name).await,
        InboundEvent::AddBot => handle_add_bot(session).await,
        InboundEvent::RemovePlayer { seat } => handle_remove_player(session, seat).await,
        InboundEvent::StartGame => dispatch_action(session, RoomAction::StartGame).await,
        InboundEvent::Declare { value } => dispatch_action(session, RoomAction::Declare { value }).await,
        InboundEvent::Play { pieces } => {
            dispatch_action(session, RoomAction::Play { pieces: pieces.into_iter().map(Into::into).collect() }).await
        }
        InboundEvent::AcceptRedeal => dispatch_action(session, RoomAction::AcceptRedeal).await,
        InboundEvent::DeclineRedeal => dispatch_action(session, RoomAction::DeclineRedeal).await,
        InboundEvent::PlayerReady => dispatch_action(session, RoomAction::PlayerReady).await,
        InboundEvent::LeaveRoom | InboundEvent::LeaveGame => {
            dispatch_action(session, RoomAction::LeaveGame).await;
            session.room = None;
            session.seat = None;
        }
        InboundEvent::Ping => session.send(OutboundEvent::Pong),
        InboundEvent::Ack { seq } => {
            if let Some(room) = session.room.clone() {
                room.ack(session.connection_id, seq).await;
            }
        }
        InboundEvent::RequestResync { from_seq } => handle_resync(session, from_seq).await,
        InboundEvent::ClientReady => {}
    }
}

async fn handle_create_room(session: &mut Session, state: &AppState, player_name: String) {
    let room = state.room_manager.create_room(player_name).await;
    let room_id = room.room_id.to_string();
    let room_code = room.room_code.clone();
    if connect_session(session, &room, 0).await {
        session.send(OutboundEvent::RoomCreated { room_id, room_code });
    }
}

async fn handle_join_room(session: &mut Session, state: &AppState, room_code: String, player_name: String) {
    let room = match state.room_manager.find_by_code(&room_code).await {
        Ok(room) => room,
        Err(err) => {
            session.send_error(err);
            return;
        }
    };
    match room.join_or_reconnect(player_name).await {
        Ok(outcome) => {
            if connect_session(session, &room, outcome.seat).await {
                session.send(OutboundEvent::RoomJoined { seat: outcome.seat });
            }
        }
        Err(err) => session.send_error(err),
    }
}

async fn connect_session(session: &mut Session, room: &RoomHandle, seat: usize) -> bool {
    match room.connect(seat, session.connection_id, session.outbound.clone()).await {
        Ok(()) => {
            session.room = Some(room.clone());
            session.seat = Some(seat);
            true
        }
        Err(err) => {
            session.send_error(err);
            false
        }
    }
}

async fn handle_add_bot(session: &Session) {
    let (Some(room), Some(seat)) = (session.room.clone(), session.seat) else {
        session.send_error("NOT_IN_ROOM");
        return;
    };
    if let Err(err) = room.add_bot(seat).await {
        session.send_error(err);
    }
}

async fn handle_remove_player(session: &Session, target_seat: usize) {
    let (Some(room), Some(seat)) = (session.room.clone(), session.seat) else {
        session.send_error("NOT_IN_ROOM");
        return;
    };
    if let Err(err) = room.remove_player(seat, target_seat).await {
        session.send_error(err);
    }
}

async fn dispatch_action(session: &Session, action: RoomAction) {
    let (Some(room), Some(seat)) = (session.room.clone(), session.seat) else {
        session.send_error("NOT_IN_ROOM");
        return;
    };
    let _ = room.dispatch_action(seat, action).await;
}

async fn handle_resync(session: &Session, from_seq: u64) {
    let Some(room) = session.room.clone() else {
        session.send_error("NOT_IN_ROOM");
        return;
    };
    metrics::resync_requests_total();
    match room.resync(from_seq).await {
        Ok(events) => {
            let events = events
                .into_iter()
                .map(|event| OutboundEnvelope::new(event.payload, Some(event.sequence)))
                .collect();
            session.send(OutboundEvent::ResyncResponse { events });
        }
        Err(err) => session.send_error(err),
    }
}
