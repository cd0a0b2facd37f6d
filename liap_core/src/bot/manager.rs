//! Bot driver: one task per room, subscribed to its [`RoomSignal`] stream,
//! submitting a delayed action on behalf of whichever seat the signal calls
//! to act.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::room::{RoomHandle, RoomSignal};

use super::decision::{self, BotSkill};

/// Minimum and maximum delay before a bot submits its decision, so bot
/// moves don't look instantaneous to connected humans.
#[derive(Clone, Copy, Debug)]
pub struct BotTiming {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BotTiming {
    fn default() -> Self {
        Self { min_delay: Duration::from_millis(500), max_delay: Duration::from_millis(1500) }
    }
}

/// Spawns the bot driver task for a single room. Returns an [`AbortHandle`]
/// the caller can use to stop the driver when the room closes.
pub fn spawn_driver(room: RoomHandle, skill: BotSkill, timing: BotTiming) -> AbortHandle {
    let mut signals = room.subscribe();
    let handle = tokio::spawn(async move {
        // (seat, phase_iteration) -> in-flight decision task, so a
        // superseded phase iteration cancels its stale decision.
        let mut pending: HashMap<usize, AbortHandle> = HashMap::new();
        loop {
            match signals.recv().await {
                Ok(signal) => handle_signal(&room, signal, skill, timing, &mut pending),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    handle.abort_handle()
}

fn handle_signal(
    room: &RoomHandle,
    signal: RoomSignal,
    skill: BotSkill,
    timing: BotTiming,
    pending: &mut HashMap<usize, AbortHandle>,
) {
    let (seat, phase_iteration) = match signal {
        RoomSignal::TurnStarted { seat, phase_iteration } => (seat, phase_iteration),
        RoomSignal::RedealOffered { seat, phase_iteration } => (seat, phase_iteration),
        RoomSignal::PhaseChanged { .. } => return,
    };

    if let Some(previous) = pending.remove(&seat) {
        previous.abort();
    }

    let room = room.clone();
    let task = tokio::spawn(async move {
        let Some(view) = room.bot_view(seat).await else { return };
        if !view_is_bot_turn(&view) {
            return;
        }
        let delay = rand::rng().random_range(timing.min_delay..timing.max_delay);
        tokio::time::sleep(delay).await;

        // Re-fetch: the phase may have advanced past this seat's turn
        // while we were sleeping (e.g. a human reconnected and acted).
        let Some(view) = room.bot_view(seat).await else { return };
        if !view_is_bot_turn(&view) {
            return;
        }

        let action = {
            let mut rng = rand::rng();
            if view.redeal_offered_to_me {
                decision::decide_redeal(&view, skill)
            } else if view.phase == crate::room::Phase::Declaration {
                decision::decide_declaration(&view, skill, &mut rng)
            } else {
                decision::decide_play(&view, skill, &mut rng)
            }
        };

        let _ = room.dispatch_action(seat, action).await;
    });

    pending.insert(seat, task.abort_handle());
    let _ = phase_iteration;
}

fn view_is_bot_turn(view: &crate::room::BotView) -> bool {
    view.is_bot && (view.redeal_offered_to_me || view.is_my_turn)
}
