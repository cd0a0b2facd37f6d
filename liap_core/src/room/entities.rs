use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::Phase;
use crate::rules::{Hand, Play};

pub type RoomId = Uuid;

/// `{ name, seat_index, is_bot, is_connected, original_is_bot, hand,
/// declared_piles, captured_piles_this_round, cumulative_score }`.
#[derive(Clone, Debug)]
pub struct Player {
    pub name: String,
    pub seat_index: usize,
    pub is_bot: bool,
    pub is_connected: bool,
    pub original_is_bot: bool,
    pub hand: Hand,
    pub declared_piles: Option<i32>,
    pub captured_piles_this_round: u32,
    pub cumulative_score: i32,
}

impl Player {
    pub fn new_human(name: String, seat_index: usize) -> Self {
        Self {
            name,
            seat_index,
            is_bot: false,
            is_connected: true,
            original_is_bot: false,
            hand: Hand::default(),
            declared_piles: None,
            captured_piles_this_round: 0,
            cumulative_score: 0,
        }
    }

    pub fn new_bot(seat_index: usize) -> Self {
        Self {
            name: format!("Bot {}", seat_index + 1),
            seat_index,
            is_bot: true,
            is_connected: true,
            original_is_bot: true,
            hand: Hand::default(),
            declared_piles: None,
            captured_piles_this_round: 0,
            cumulative_score: 0,
        }
    }

    /// Flips this seat to bot-controlled on disconnect, preserving whether
    /// it was originally a bot so reconnection can restore control.
    pub fn mark_disconnected(&mut self) {
        self.is_connected = false;
        self.is_bot = true;
    }

    /// Restores human control on reconnection.
    pub fn mark_reconnected(&mut self) {
        self.is_connected = true;
        self.is_bot = self.original_is_bot;
    }

    pub fn reset_for_round(&mut self) {
        self.hand = Hand::default();
        self.declared_piles = None;
        self.captured_piles_this_round = 0;
    }
}

/// One trick in progress: the seat that led, and plays in the order they
/// were made.
#[derive(Clone, Debug, Default)]
pub struct Trick {
    pub lead_seat: usize,
    pub plays: Vec<(usize, Play)>,
}

impl Trick {
    pub fn new(lead_seat: usize) -> Self {
        Self {
            lead_seat,
            plays: Vec::new(),
        }
    }

    pub fn lead_play(&self) -> Option<&Play> {
        self.plays.first().map(|(_, play)| play)
    }

    pub fn is_complete(&self) -> bool {
        self.plays.len() == 4
    }
}

/// Room-scoped tuning knobs. All externally configurable per the transport
/// layer's environment-driven configuration.
#[derive(Clone, Copy, Debug)]
pub struct RoomConfig {
    pub win_threshold: i32,
    pub redeal_cap: u32,
    pub turn_results_display: std::time::Duration,
    /// Capacity of a room actor's inbound mailbox. A full mailbox rejects
    /// the submitting connection with `Busy` rather than blocking.
    pub inbound_queue_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            win_threshold: 50,
            redeal_cap: 3,
            turn_results_display: std::time::Duration::from_millis(7000),
            inbound_queue_size: 256,
        }
    }
}

/// Lobby-listing summary: `list_rooms` and the archival hook both consume
/// this shape.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub room_code: String,
    pub host_name: String,
    pub occupied: usize,
    pub total: usize,
    pub started: bool,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a 6-character human-shareable room code. Ambiguous characters
/// (0/O, 1/I) are excluded from the alphabet.
pub fn generate_room_code(rng: &mut ThreadRng) -> String {
    (0..6)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_is_six_chars() {
        let mut rng = rand::rng();
        let code = generate_room_code(&mut rng);
        assert_eq!(code.len(), 6);
    }

    #[test]
    fn disconnect_then_reconnect_restores_human_control() {
        let mut player = Player::new_human("Alice".into(), 0);
        player.mark_disconnected();
        assert!(player.is_bot);
        assert!(!player.is_connected);
        player.mark_reconnected();
        assert!(!player.is_bot);
        assert!(player.is_connected);
    }

    #[test]
    fn bot_seat_stays_bot_after_reconnect_cycle() {
        let mut bot = Player::new_bot(1);
        bot.mark_disconnected();
        bot.mark_reconnected();
        assert!(bot.is_bot);
    }
}
