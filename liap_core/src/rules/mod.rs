//! Pure game-rules evaluation: pieces, hands, plays, scoring.
//!
//! No mutation, no scheduling, no I/O. Everything here is a deterministic
//! function over value types owned by callers in [`crate::room`].

mod deal;
mod hand;
mod piece;
mod play;
mod score;

pub use deal::{Deck, deal, red_general_holder};
pub use hand::{Hand, is_weak, strength as hand_strength};
pub use piece::{Color, Kind, Piece, full_deck};
pub use play::{Play, PlayType, classify, legal_follow, point_sum, strength};
pub use score::score_round;

use thiserror::Error;

/// Errors surfaced by pure rules evaluation.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum RulesError {
    #[error("play has no valid classification")]
    InvalidPlay,
    #[error("play length does not match the lead")]
    WrongLength,
    #[error("piece is not in hand")]
    PieceNotInHand,
}

/// Strength threshold at or below which a hand is considered weak enough to
/// warrant a redeal offer. The full deck averages 6 points/piece, so an
/// 8-piece hand averages ~48; 32 sits comfortably below that average without
/// triggering on most hands.
pub const WEAK_HAND_THRESHOLD: i32 = 32;

/// Fixed scoring bonus added to a correct (non-zero) declaration.
pub const SCORE_BONUS: i32 = 5;

/// Multiplier applied to the penalty when a player declared zero and missed.
pub const ZERO_DECLARE_MULTIPLIER: i32 = 2;
