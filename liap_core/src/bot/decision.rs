//! Bot decision-making: pure functions from a seat's view of the room to the
//! action it should submit. No difficulty tiers beyond [`BotSkill`] — these
//! bots exist to keep a room moving when a human disconnects, not to play
//! well.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::room::{BotView, Phase, RoomAction};
use crate::rules::{self, Piece, Play};

/// Tuning knob for how a bot plays. `Random` never evaluates hand strength;
/// `Greedy` prefers its highest-value legal play, mirroring a cautious human.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BotSkill {
    Random,
    #[default]
    Greedy,
}

/// Decides the redeal response for a bot offered one: accepts when its hand
/// strength sits strictly below the weak-hand threshold, declines otherwise.
/// Skill-independent — risk tolerance isn't something a bot varies on.
pub fn decide_redeal(view: &BotView, _skill: BotSkill) -> RoomAction {
    let hand = crate::rules::Hand::new(view.hand.clone());
    if rules::hand_strength(&hand) < rules::WEAK_HAND_THRESHOLD {
        RoomAction::AcceptRedeal
    } else {
        RoomAction::DeclineRedeal
    }
}

/// Decides a declaration. `Greedy` declares based on hand strength scaled
/// into the 0-8 range; `Random` picks uniformly. Either way, if this is the
/// final declarer (`declared_count == 3`) and the greedy pick would make the
/// table sum exactly 8, nudge by one to stay legal.
pub fn decide_declaration(view: &BotView, skill: BotSkill, rng: &mut impl Rng) -> RoomAction {
    let hand = crate::rules::Hand::new(view.hand.clone());
    let mut value = match skill {
        BotSkill::Random => rng.random_range(0..=8),
        BotSkill::Greedy => {
            let strength = rules::hand_strength(&hand);
            // Hand strength ranges roughly 0-120 across an 8-piece hand;
            // scale into 0-8 and clamp.
            ((strength * 8) / 120).clamp(0, 8)
        }
    };
    if view.declared_count == 3 {
        let already: i32 = view.declarations.iter().filter_map(|d| *d).sum();
        if already + value == 8 {
            value = if value == 8 { 7 } else { value + 1 };
        }
    }
    RoomAction::Declare { value }
}

/// Decides a play. When leading, picks the lowest-value classifiable
/// subset of the required length (or falls back to a bare single) so bots
/// don't hoard strong combinations. When following, copies the lead's
/// length and plays whatever legally matches it, preferring the weakest
/// pieces that still satisfy the follow.
pub fn decide_play(view: &BotView, skill: BotSkill, rng: &mut impl Rng) -> RoomAction {
    let hand = view.hand.clone();
    match &view.lead_play {
        None => RoomAction::Play {
            pieces: lead_candidate(&hand, skill, rng),
        },
        Some(lead) => RoomAction::Play {
            pieces: follow_candidate(&hand, lead.len(), skill, rng),
        },
    }
}

fn lead_candidate(hand: &[Piece], skill: BotSkill, rng: &mut impl Rng) -> Vec<Piece> {
    for len in 1..=hand.len().min(6) {
        let mut candidates: Vec<Vec<Piece>> = combinations(hand, len)
            .into_iter()
            .filter(|combo| Play::new(combo.clone()).ok().as_ref().is_some_and(|p| rules::classify(p).is_some()))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by_key(|combo| combo.iter().map(|p| p.point_value()).sum::<i32>());
        return match skill {
            BotSkill::Greedy => candidates.into_iter().next().unwrap_or_default(),
            BotSkill::Random => candidates.choose(rng).cloned().unwrap_or_default(),
        };
    }
    hand.first().copied().into_iter().collect()
}

fn follow_candidate(hand: &[Piece], len: usize, skill: BotSkill, rng: &mut impl Rng) -> Vec<Piece> {
    let mut candidates = combinations(hand, len.min(hand.len()).max(1));
    if candidates.is_empty() {
        return hand.to_vec();
    }
    candidates.sort_by_key(|combo| combo.iter().map(|p| p.point_value()).sum::<i32>());
    match skill {
        BotSkill::Greedy => candidates.into_iter().next().unwrap_or_default(),
        BotSkill::Random => candidates.choose(rng).cloned().unwrap_or_default(),
    }
}

/// All length-`len` subsets of `pieces`, order-preserved. Hands never
/// exceed 8 pieces, so this stays small (at most C(8,4) = 70).
fn combinations(pieces: &[Piece], len: usize) -> Vec<Vec<Piece>> {
    if len == 0 || len > pieces.len() {
        return Vec::new();
    }
    if len == pieces.len() {
        return vec![pieces.to_vec()];
    }
    let mut result = Vec::new();
    combine_from(pieces, len, 0, &mut Vec::new(), &mut result);
    result
}

fn combine_from(pieces: &[Piece], len: usize, start: usize, current: &mut Vec<Piece>, result: &mut Vec<Vec<Piece>>) {
    if current.len() == len {
        result.push(current.clone());
        return;
    }
    for i in start..pieces.len() {
        current.push(pieces[i]);
        combine_from(pieces, len, i + 1, current, result);
        current.pop();
    }
}

pub fn phase_needs_decision(phase: Phase) -> bool {
    matches!(phase, Phase::Declaration | Phase::Turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Color, Kind};

    fn piece(kind: Kind, color: Color) -> Piece {
        Piece::new(kind, color)
    }

    fn sample_hand() -> Vec<Piece> {
        vec![
            piece(Kind::General, Color::Red),
            piece(Kind::Soldier, Color::Black),
            piece(Kind::Soldier, Color::Red),
            piece(Kind::Cannon, Color::Black),
        ]
    }

    fn strong_hand() -> Vec<Piece> {
        vec![
            piece(Kind::Advisor, Color::Red),
            piece(Kind::Elephant, Color::Red),
            piece(Kind::Chariot, Color::Red),
            piece(Kind::Horse, Color::Red),
        ]
    }

    fn view(hand: Vec<Piece>) -> BotView {
        BotView {
            my_seat: 0,
            is_bot: true,
            phase: Phase::Declaration,
            hand,
            is_my_turn: true,
            lead_play: None,
            declarations: [None; 4],
            declared_count: 0,
            redeal_offered_to_me: false,
        }
    }

    #[test]
    fn decide_redeal_accepts_a_weak_hand() {
        let view = view(sample_hand());
        assert!(matches!(decide_redeal(&view, BotSkill::Greedy), RoomAction::AcceptRedeal));
        assert!(matches!(decide_redeal(&view, BotSkill::Random), RoomAction::AcceptRedeal));
    }

    #[test]
    fn decide_redeal_declines_a_strong_hand() {
        let view = view(strong_hand());
        assert!(matches!(decide_redeal(&view, BotSkill::Greedy), RoomAction::DeclineRedeal));
        assert!(matches!(decide_redeal(&view, BotSkill::Random), RoomAction::DeclineRedeal));
    }

    #[test]
    fn declaration_stays_within_legal_range() {
        let mut rng = rand::rng();
        for skill in [BotSkill::Greedy, BotSkill::Random] {
            let action = decide_declaration(&view(sample_hand()), skill, &mut rng);
            match action {
                RoomAction::Declare { value } => assert!((0..=8).contains(&value)),
                other => panic!("expected declare, got {other:?}"),
            }
        }
    }

    #[test]
    fn final_declarer_never_makes_the_sum_eight() {
        let mut rng = rand::rng();
        let mut bot_view = view(sample_hand());
        bot_view.declared_count = 3;
        bot_view.declarations = [Some(2), Some(3), Some(3), None];
        // Already-declared sum is 8; any greedy/random pick the bot makes
        // must be nudged away from value 0 (which would also total 8).
        for skill in [BotSkill::Greedy, BotSkill::Random] {
            let action = decide_declaration(&bot_view, skill, &mut rng);
            match action {
                RoomAction::Declare { value } => {
                    let total: i32 = bot_view.declarations.iter().filter_map(|d| *d).sum::<i32>() + value;
                    assert_ne!(total, 8);
                }
                other => panic!("expected declare, got {other:?}"),
            }
        }
    }

    #[test]
    fn leading_play_picks_a_classifiable_subset() {
        let mut rng = rand::rng();
        let mut bot_view = view(sample_hand());
        bot_view.lead_play = None;
        let action = decide_play(&bot_view, BotSkill::Greedy, &mut rng);
        match action {
            RoomAction::Play { pieces } => assert!(!pieces.is_empty()),
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn following_play_matches_lead_length() {
        let mut rng = rand::rng();
        let mut bot_view = view(sample_hand());
        let lead = vec![piece(Kind::Horse, Color::Red), piece(Kind::Horse, Color::Black)];
        bot_view.lead_play = Some(lead.clone());
        let action = decide_play(&bot_view, BotSkill::Greedy, &mut rng);
        match action {
            RoomAction::Play { pieces } => assert_eq!(pieces.len(), lead.len()),
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn phase_needs_decision_matches_declaration_and_turn_only() {
        assert!(phase_needs_decision(Phase::Declaration));
        assert!(phase_needs_decision(Phase::Turn));
        assert!(!phase_needs_decision(Phase::Lobby));
        assert!(!phase_needs_decision(Phase::Preparation));
        assert!(!phase_needs_decision(Phase::TurnResults));
        assert!(!phase_needs_decision(Phase::Scoring));
        assert!(!phase_needs_decision(Phase::GameOver));
    }
}
