use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven piece kinds, ordered strongest to weakest for same-color
/// singles.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Kind {
    General,
    Advisor,
    Elephant,
    Chariot,
    Horse,
    Cannon,
    Soldier,
}

impl Kind {
    /// How many pieces of this kind exist per color in a full 32-piece deck.
    pub const fn count_per_color(self) -> usize {
        match self {
            Kind::General => 1,
            Kind::Advisor | Kind::Elephant | Kind::Chariot | Kind::Horse | Kind::Cannon => 2,
            Kind::Soldier => 5,
        }
    }

    pub const ALL: [Kind; 7] = [
        Kind::General,
        Kind::Advisor,
        Kind::Elephant,
        Kind::Chariot,
        Kind::Horse,
        Kind::Cannon,
        Kind::Soldier,
    ];
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Kind::General => "GENERAL",
            Kind::Advisor => "ADVISOR",
            Kind::Elephant => "ELEPHANT",
            Kind::Chariot => "CHARIOT",
            Kind::Horse => "HORSE",
            Kind::Cannon => "CANNON",
            Kind::Soldier => "SOLDIER",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Color::Red { "RED" } else { "BLACK" })
    }
}

/// A playing-piece identity: (kind, color) with a point value fixed by the
/// pair. Immutable value object.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Piece {
    pub kind: Kind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: Kind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Fixed point value for this (kind, color) pair. Red outranks black at
    /// the same kind; kinds rank General > Advisor > Elephant > Chariot >
    /// Horse > Cannon > Soldier.
    pub const fn point_value(self) -> i32 {
        let kind_base = match self.kind {
            Kind::General => 14,
            Kind::Advisor => 12,
            Kind::Elephant => 10,
            Kind::Chariot => 8,
            Kind::Horse => 6,
            Kind::Cannon => 4,
            Kind::Soldier => 2,
        };
        match self.color {
            Color::Red => kind_base,
            Color::Black => kind_base - 1,
        }
    }

    /// True for GENERAL/ADVISOR/ELEPHANT, the "civil" group used by
    /// STRAIGHT/EXTENDED_STRAIGHT/EXTENDED_STRAIGHT_5 classification.
    pub const fn is_civil_group(self) -> bool {
        matches!(self.kind, Kind::General | Kind::Advisor | Kind::Elephant)
    }

    /// True for CHARIOT/HORSE/CANNON, the "military" group used by the same
    /// straight-family classifications (and DOUBLE_STRAIGHT).
    pub const fn is_military_group(self) -> bool {
        matches!(self.kind, Kind::Chariot | Kind::Horse | Kind::Cannon)
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.kind)
    }
}

/// Build the fixed 32-piece deck multiset (unshuffled, deterministic order).
pub fn full_deck() -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(32);
    for &kind in &Kind::ALL {
        for &color in &[Color::Red, Color::Black] {
            for _ in 0..kind.count_per_color() {
                pieces.push(Piece::new(kind, color));
            }
        }
    }
    pieces
}
