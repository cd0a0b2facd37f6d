use serde::{Deserialize, Serialize};

/// The seven coarse states a room occupies. A tagged variant dispatched by
/// `match` in the room actor — not a polymorphic hierarchy of phase types.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Lobby,
    Preparation,
    Declaration,
    Turn,
    TurnResults,
    Scoring,
    GameOver,
}

impl Phase {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Phase::Lobby => "LOBBY",
            Phase::Preparation => "PREPARATION",
            Phase::Declaration => "DECLARATION",
            Phase::Turn => "TURN",
            Phase::TurnResults => "TURN_RESULTS",
            Phase::Scoring => "SCORING",
            Phase::GameOver => "GAME_OVER",
        }
    }
}
