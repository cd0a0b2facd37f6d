//! # Liap Tui Core
//!
//! The realtime game server core for Liap Tui, a four-player turn-based
//! trick-taking card game. An actor-per-room architecture replaces shared
//! mutable state: each room is a single task owning its own game state,
//! reachable only through message passing, so correctness never depends on
//! lock ordering.
//!
//! ## Core Modules
//!
//! - [`rules`]: the deck, hands, plays, and scoring — pure functions and
//!   value types with no knowledge of rooms, connections, or the network.
//! - [`events`]: per-room event numbering, the bounded ring buffer used for
//!   resync, and the offline queue used while a seat is disconnected.
//! - [`protocol`]: the wire envelope and the closed sets of inbound/outbound
//!   event kinds.
//! - [`room`]: the room state machine, its actor and handle, and the
//!   manager that spawns and looks rooms up by code.
//! - [`bot`]: the bot driver that keeps a room moving when a seat is
//!   disconnected or was never claimed by a human.
//! - [`archival`]: the hook a completed room's event stream is handed to on
//!   close.

pub mod archival;
pub mod bot;
pub mod events;
pub mod protocol;
pub mod room;
pub mod rules;
