mod actor;
mod entities;
mod manager;
mod messages;
mod phase;

pub use actor::{BotView, JoinOutcome, RoomActor, RoomHandle, RoomSignal};
pub use entities::{Player, RoomConfig, RoomId, RoomSummary, Trick, generate_room_code};
pub use manager::{RoomManager, RoomManagerError};
pub use messages::{RoomAction, RoomError, RoomMessage};
pub use phase::Phase;
