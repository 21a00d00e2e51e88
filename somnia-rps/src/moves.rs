use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A player's hand. Ordinals are fixed by the hub contract's enum and
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Move {
    /// Absence sentinel; never a valid committed value.
    None = 0,
    Rock = 1,
    Paper = 2,
    Scissors = 3,
}

impl Move {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(v: u8) -> Option<Move> {
        match v {
            0 => Some(Move::None),
            1 => Some(Move::Rock),
            2 => Some(Move::Paper),
            3 => Some(Move::Scissors),
            _ => None,
        }
    }

    /// True if `self` defeats `other`. A real move beats an absent one;
    /// `None` beats nothing.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Paper, Move::Rock)
                | (Move::Scissors, Move::Paper)
                | (Move::Rock, Move::None)
                | (Move::Paper, Move::None)
                | (Move::Scissors, Move::None)
        )
    }

    pub fn is_playable(self) -> bool {
        self != Move::None
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::None => "none",
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        };
        f.write_str(s)
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rock" | "r" => Ok(Move::Rock),
            "paper" | "p" => Ok(Move::Paper),
            "scissors" | "s" => Ok(Move::Scissors),
            other => Err(format!("unknown move: {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_match_the_contract_enum() {
        assert_eq!(Move::None.ordinal(), 0);
        assert_eq!(Move::Rock.ordinal(), 1);
        assert_eq!(Move::Paper.ordinal(), 2);
        assert_eq!(Move::Scissors.ordinal(), 3);
        assert_eq!(Move::from_ordinal(3), Some(Move::Scissors));
        assert_eq!(Move::from_ordinal(4), None);
    }

    #[test]
    fn beats_matrix() {
        assert!(Move::Rock.beats(Move::Scissors));
        assert!(Move::Paper.beats(Move::Rock));
        assert!(Move::Scissors.beats(Move::Paper));
        assert!(!Move::Rock.beats(Move::Paper));
        assert!(!Move::Rock.beats(Move::Rock));
        assert!(Move::Rock.beats(Move::None));
        assert!(!Move::None.beats(Move::Rock));
        assert!(!Move::None.beats(Move::None));
    }

    #[test]
    fn parses_shorthand() {
        assert_eq!("rock".parse::<Move>().unwrap(), Move::Rock);
        assert_eq!("S".parse::<Move>().unwrap(), Move::Scissors);
        assert!("lizard".parse::<Move>().is_err());
    }
}
