//! Drives a full room lifecycle through a real `RoomActor`: four seats join,
//! the host starts the game, and every redeal offer/declaration/play is
//! answered by the same decision functions the bot driver uses, until a
//! round reaches scoring and the game concludes. Exercises the actor's
//! phase machine end to end rather than any single action in isolation.

use std::sync::Arc;
use std::time::Duration;

use liap_core::archival::NoopArchivalSink;
use liap_core::bot::decision::{BotSkill, decide_declaration, decide_play};
use liap_core::events::EventLogConfig;
use liap_core::room::{Phase, RoomAction, RoomConfig, RoomManager, RoomSignal};
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

fn fast_room_config() -> RoomConfig {
    RoomConfig {
        win_threshold: 1,
        redeal_cap: 3,
        turn_results_display: Duration::from_millis(10),
        inbound_queue_size: 256,
    }
}

/// Answers every redeal offer, declaration, and play for all four seats
/// using the bot decision functions, until the room reaches `GameOver` or
/// `max_rounds` scoring events pass without it. Mirrors `bot::manager`'s own
/// signal-driven loop, except it answers every seat rather than only bots.
///
/// Takes an already-subscribed receiver: subscribing only after the action
/// that kicks off the round would race the first signals the actor emits
/// while handling that very action.
async fn play_until_game_over(handle: &liap_core::room::RoomHandle, mut signals: Receiver<RoomSignal>, max_rounds: usize) {
    let mut rng = rand::rng();
    let mut rounds_seen = 0usize;

    loop {
        let signal = timeout(Duration::from_secs(5), signals.recv())
            .await
            .expect("timed out waiting for a room signal")
            .expect("signal channel closed before game over");

        match signal {
            RoomSignal::PhaseChanged { phase: Phase::GameOver, .. } => break,
            RoomSignal::PhaseChanged { phase: Phase::Scoring, .. } => {
                rounds_seen += 1;
                assert!(rounds_seen <= max_rounds, "game did not conclude within {max_rounds} rounds");
                for seat in 0..4 {
                    handle.dispatch_action(seat, RoomAction::PlayerReady).await.unwrap();
                }
            }
            RoomSignal::PhaseChanged { .. } => {}
            RoomSignal::RedealOffered { seat, .. } => {
                handle.dispatch_action(seat, RoomAction::DeclineRedeal).await.unwrap();
            }
            RoomSignal::TurnStarted { seat, .. } => {
                let Some(view) = handle.bot_view(seat).await else { continue };
                let action = match view.phase {
                    Phase::Declaration => decide_declaration(&view, BotSkill::Greedy, &mut rng),
                    Phase::Turn => decide_play(&view, BotSkill::Greedy, &mut rng),
                    _ => continue,
                };
                handle.dispatch_action(seat, action).await.unwrap();
            }
        }
    }
}

#[tokio::test]
async fn full_round_reaches_scoring_and_game_over() {
    let manager = RoomManager::new(fast_room_config(), EventLogConfig::default(), Arc::new(NoopArchivalSink));

    let handle = manager.create_room("Alice".into()).await;
    for name in ["Bob", "Carol", "Dave"] {
        let outcome = handle.join_or_reconnect(name.into()).await.unwrap();
        assert!(!outcome.reconnected);
    }

    let signals = handle.subscribe();
    handle.dispatch_action(0, RoomAction::StartGame).await.unwrap();

    // A hand is dealt immediately; every seat should see 8 pieces.
    for seat in 0..4 {
        let view = handle.bot_view(seat).await.unwrap();
        assert_eq!(view.hand.len(), 8);
    }

    play_until_game_over(&handle, signals, 10).await;

    let summary = handle.summary().await.unwrap();
    assert!(summary.started);
}

#[tokio::test]
async fn start_game_is_rejected_with_an_empty_seat() {
    let manager = RoomManager::new(RoomConfig::default(), EventLogConfig::default(), Arc::new(NoopArchivalSink));
    let handle = manager.create_room("Alice".into()).await;
    handle.join_or_reconnect("Bob".into()).await.unwrap();

    let result = handle.dispatch_action(0, RoomAction::StartGame).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn start_game_is_rejected_from_a_non_host_seat() {
    let manager = RoomManager::new(RoomConfig::default(), EventLogConfig::default(), Arc::new(NoopArchivalSink));
    let handle = manager.create_room("Alice".into()).await;
    for name in ["Bob", "Carol", "Dave"] {
        handle.join_or_reconnect(name.into()).await.unwrap();
    }

    let result = handle.dispatch_action(1, RoomAction::StartGame).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reconnecting_by_name_returns_the_same_seat() {
    let manager = RoomManager::new(RoomConfig::default(), EventLogConfig::default(), Arc::new(NoopArchivalSink));
    let handle = manager.create_room("Alice".into()).await;
    handle.join_or_reconnect("Bob".into()).await.unwrap();

    let outcome = handle.join_or_reconnect("Bob".into()).await.unwrap();
    assert_eq!(outcome.seat, 1);
    assert!(outcome.reconnected);
}

#[tokio::test]
async fn adding_a_bot_fills_the_next_empty_seat() {
    let manager = RoomManager::new(RoomConfig::default(), EventLogConfig::default(), Arc::new(NoopArchivalSink));
    let handle = manager.create_room("Alice".into()).await;

    let seat = handle.add_bot(0).await.unwrap();
    assert_eq!(seat, 1);
    let view = handle.bot_view(1).await.unwrap();
    assert!(view.is_bot);
}
