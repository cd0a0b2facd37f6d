use std::collections::HashMap;

use super::RulesError;
use super::hand::Hand;
use super::piece::{Color, Kind, Piece};

/// The nine recognized play shapes. Order is not significant; only pieces
/// within a play's own classification are ever compared.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayType {
    Single,
    Pair,
    ThreeOfKind,
    Straight,
    FourOfKind,
    ExtendedStraight,
    FiveOfKind,
    ExtendedStraight5,
    DoubleStraight,
}

const CIVIL_GROUP: [Kind; 3] = [Kind::General, Kind::Advisor, Kind::Elephant];
const MILITARY_GROUP: [Kind; 3] = [Kind::Chariot, Kind::Horse, Kind::Cannon];

/// An ordered tuple of 1-6 pieces declared by a seat on their turn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Play {
    pieces: Vec<Piece>,
}

impl Play {
    pub fn new(pieces: Vec<Piece>) -> Result<Self, RulesError> {
        if pieces.is_empty() || pieces.len() > 6 {
            return Err(RulesError::InvalidPlay);
        }
        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

fn kind_counts(pieces: &[Piece]) -> HashMap<Kind, usize> {
    let mut counts = HashMap::new();
    for piece in pieces {
        *counts.entry(piece.kind).or_insert(0) += 1;
    }
    counts
}

fn same_color(pieces: &[Piece]) -> Option<Color> {
    let first = pieces.first()?.color;
    if pieces.iter().all(|p| p.color == first) {
        Some(first)
    } else {
        None
    }
}

fn is_group_shape(counts: &HashMap<Kind, usize>, group: &[Kind; 3], pattern: &[usize]) -> bool {
    if counts.len() != group.iter().filter(|k| counts.contains_key(k)).count() {
        return false;
    }
    if counts.keys().any(|k| !group.contains(k)) {
        return false;
    }
    let mut observed: Vec<usize> = group.iter().map(|k| *counts.get(k).unwrap_or(&0)).collect();
    observed.sort_unstable();
    let mut expected = pattern.to_vec();
    expected.sort_unstable();
    observed == expected
}

/// Decides the play's classification by the fixed combinatorial rules.
/// `None` means the play is invalid (no rule matches).
pub fn classify(play: &Play) -> Option<PlayType> {
    let pieces = play.pieces();
    if pieces.len() == 1 {
        return Some(PlayType::Single);
    }

    let color = same_color(pieces)?;
    let _ = color;
    let counts = kind_counts(pieces);

    match pieces.len() {
        2 => {
            if counts.len() == 1 && counts.values().next() == Some(&2) {
                Some(PlayType::Pair)
            } else {
                None
            }
        }
        3 => {
            if counts.len() == 1 && counts.get(&Kind::Soldier) == Some(&3) {
                return Some(PlayType::ThreeOfKind);
            }
            if is_group_shape(&counts, &CIVIL_GROUP, &[1, 1, 1])
                || is_group_shape(&counts, &MILITARY_GROUP, &[1, 1, 1])
            {
                Some(PlayType::Straight)
            } else {
                None
            }
        }
        4 => {
            if counts.len() == 1 && counts.get(&Kind::Soldier) == Some(&4) {
                return Some(PlayType::FourOfKind);
            }
            if is_group_shape(&counts, &CIVIL_GROUP, &[1, 1, 2])
                || is_group_shape(&counts, &MILITARY_GROUP, &[1, 1, 2])
            {
                Some(PlayType::ExtendedStraight)
            } else {
                None
            }
        }
        5 => {
            if counts.len() == 1 && counts.get(&Kind::Soldier) == Some(&5) {
                return Some(PlayType::FiveOfKind);
            }
            if is_group_shape(&counts, &CIVIL_GROUP, &[1, 2, 2])
                || is_group_shape(&counts, &MILITARY_GROUP, &[1, 2, 2])
            {
                Some(PlayType::ExtendedStraight5)
            } else {
                None
            }
        }
        6 => {
            if counts.get(&Kind::Chariot) == Some(&2)
                && counts.get(&Kind::Horse) == Some(&2)
                && counts.get(&Kind::Cannon) == Some(&2)
                && counts.len() == 3
            {
                Some(PlayType::DoubleStraight)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Sum of point values across the play's pieces; the secondary tie-break
/// after [`strength`] when comparing two plays of the same length.
pub fn point_sum(play: &Play) -> i32 {
    play.pieces().iter().map(|p| p.point_value()).sum()
}

/// Primary comparator for plays of the same classification: the highest
/// single piece's point value. Defined only for classifiable plays.
pub fn strength(play: &Play) -> Result<i32, RulesError> {
    if classify(play).is_none() {
        return Err(RulesError::InvalidPlay);
    }
    play.pieces()
        .iter()
        .map(|p| p.point_value())
        .max()
        .ok_or(RulesError::InvalidPlay)
}

/// A follow is legal iff it matches the lead's piece count and every piece
/// in it is present in the hand. Plays need not match the lead's type; a
/// seat that cannot match the lead's type may still follow with any pieces
/// of the required length (forfeiting the trick).
pub fn legal_follow(play: &Play, lead: &Play, hand: &Hand) -> bool {
    play.len() == lead.len() && hand.contains_all(play.pieces())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(kind: Kind, color: Color) -> Piece {
        Piece::new(kind, color)
    }

    #[test]
    fn single_always_classifies() {
        let play = Play::new(vec![p(Kind::Soldier, Color::Red)]).unwrap();
        assert_eq!(classify(&play), Some(PlayType::Single));
    }

    #[test]
    fn pair_requires_identical_pieces() {
        let matching = Play::new(vec![p(Kind::Horse, Color::Black), p(Kind::Horse, Color::Black)]).unwrap();
        assert_eq!(classify(&matching), Some(PlayType::Pair));

        let mismatched =
            Play::new(vec![p(Kind::Horse, Color::Black), p(Kind::Horse, Color::Red)]).unwrap();
        assert_eq!(classify(&mismatched), None);
    }

    #[test]
    fn three_soldiers_same_color_is_three_of_kind() {
        let play = Play::new(vec![
            p(Kind::Soldier, Color::Red),
            p(Kind::Soldier, Color::Red),
            p(Kind::Soldier, Color::Red),
        ])
        .unwrap();
        assert_eq!(classify(&play), Some(PlayType::ThreeOfKind));
    }

    #[test]
    fn civil_straight_classifies() {
        let play = Play::new(vec![
            p(Kind::General, Color::Red),
            p(Kind::Advisor, Color::Red),
            p(Kind::Elephant, Color::Red),
        ])
        .unwrap();
        assert_eq!(classify(&play), Some(PlayType::Straight));
    }

    #[test]
    fn mixed_colors_never_classify() {
        let play = Play::new(vec![
            p(Kind::General, Color::Red),
            p(Kind::Advisor, Color::Black),
            p(Kind::Elephant, Color::Red),
        ])
        .unwrap();
        assert_eq!(classify(&play), None);
    }

    #[test]
    fn extended_straight_requires_one_doubled_kind() {
        let play = Play::new(vec![
            p(Kind::Chariot, Color::Black),
            p(Kind::Chariot, Color::Black),
            p(Kind::Horse, Color::Black),
            p(Kind::Cannon, Color::Black),
        ])
        .unwrap();
        assert_eq!(classify(&play), Some(PlayType::ExtendedStraight));
    }

    #[test]
    fn double_straight_requires_two_each() {
        let play = Play::new(vec![
            p(Kind::Chariot, Color::Red),
            p(Kind::Chariot, Color::Red),
            p(Kind::Horse, Color::Red),
            p(Kind::Horse, Color::Red),
            p(Kind::Cannon, Color::Red),
            p(Kind::Cannon, Color::Red),
        ])
        .unwrap();
        assert_eq!(classify(&play), Some(PlayType::DoubleStraight));
    }

    #[test]
    fn legal_follow_ignores_type_but_checks_length_and_hand() {
        let lead = Play::new(vec![p(Kind::Soldier, Color::Red)]).unwrap();
        let follow = Play::new(vec![p(Kind::Soldier, Color::Black)]).unwrap();
        let hand = Hand::new(vec![p(Kind::Soldier, Color::Black)]);
        assert!(legal_follow(&follow, &lead, &hand));

        let empty_hand = Hand::new(vec![]);
        assert!(!legal_follow(&follow, &lead, &empty_hand));
    }
}
