use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::events::{ConnectionId, Event, EventLogError};
use crate::protocol::OutboundEnvelope;
use crate::rules::Piece;

use super::actor::{BotView, JoinOutcome};
use super::entities::RoomSummary;

/// The six action kinds a connected client (or the bot driver) may submit.
#[derive(Clone, Debug)]
pub enum RoomAction {
    StartGame,
    AcceptRedeal,
    DeclineRedeal,
    Declare { value: i32 },
    Play { pieces: Vec<Piece> },
    LeaveGame,
    PlayerReady,
}

/// Messages accepted by a room actor's inbound queue.
pub enum RoomMessage {
    Action {
        seat: usize,
        action: RoomAction,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    Connect {
        seat: usize,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<OutboundEnvelope>,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnect {
        seat: usize,
    },
    Ack {
        connection_id: ConnectionId,
        sequence: u64,
    },
    Resync {
        from_sequence: u64,
        response: oneshot::Sender<Result<Vec<Event>, EventLogError>>,
    },
    GetSummary {
        response: oneshot::Sender<RoomSummary>,
    },
    BotView {
        seat: usize,
        response: oneshot::Sender<Option<BotView>>,
    },
    JoinOrReconnect {
        player_name: String,
        response: oneshot::Sender<Result<JoinOutcome, RoomError>>,
    },
    AddBot {
        issued_by_seat: usize,
        response: oneshot::Sender<Result<usize, RoomError>>,
    },
    RemovePlayer {
        issued_by_seat: usize,
        seat: usize,
        response: oneshot::Sender<Result<(), RoomError>>,
    },
    Close {
        response: oneshot::Sender<()>,
    },
    Tick,
}

impl std::fmt::Debug for RoomMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomMessage::Action { seat, action, .. } => {
                f.debug_struct("Action").field("seat", seat).field("action", action).finish()
            }
            RoomMessage::Connect { seat, .. } => f.debug_struct("Connect").field("seat", seat).finish(),
            RoomMessage::Disconnect { seat } => f.debug_struct("Disconnect").field("seat", seat).finish(),
            RoomMessage::Ack { sequence, .. } => f.debug_struct("Ack").field("sequence", sequence).finish(),
            RoomMessage::Resync { from_sequence, .. } => {
                f.debug_struct("Resync").field("from_sequence", from_sequence).finish()
            }
            RoomMessage::GetSummary { .. } => write!(f, "GetSummary"),
            RoomMessage::BotView { seat, .. } => f.debug_struct("BotView").field("seat", seat).finish(),
            RoomMessage::JoinOrReconnect { player_name, .. } => {
                f.debug_struct("JoinOrReconnect").field("player_name", player_name).finish()
            }
            RoomMessage::AddBot { issued_by_seat, .. } => {
                f.debug_struct("AddBot").field("issued_by_seat", issued_by_seat).finish()
            }
            RoomMessage::RemovePlayer { issued_by_seat, seat, .. } => f
                .debug_struct("RemovePlayer")
                .field("issued_by_seat", issued_by_seat)
                .field("seat", seat)
                .finish(),
            RoomMessage::Close { .. } => write!(f, "Close"),
            RoomMessage::Tick => write!(f, "Tick"),
        }
    }
}

/// Semantic error taxonomy for room/game-logic failures: protocol/phase
/// violations and internal-invariant kinds. Reported to the submitting
/// connection as `action_rejected{reason}`; never broadcast.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RoomError {
    #[error("NOT_HOST")]
    NotHost,
    #[error("NOT_FULL")]
    NotFull,
    #[error("WRONG_PHASE")]
    WrongPhase,
    #[error("NOT_YOUR_TURN")]
    NotYourTurn,
    #[error("SEAT_VACANT")]
    SeatVacant,
    #[error("ILLEGAL_PLAY")]
    IllegalPlay,
    #[error("ILLEGAL_DECLARATION")]
    IllegalDeclaration,
    #[error("NO_REDEAL_OFFERED")]
    NoRedealOffered,
    #[error("BUSY")]
    Busy,
    #[error("INVARIANT_VIOLATION: {0}")]
    InvariantViolation(String),
}
