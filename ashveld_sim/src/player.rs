// Player identities.
//
// A `Player` identifies ownership of tiles and units and is the unit of
// vision grants. The set is closed: eight playable colors plus `None`
// (unowned) and `Observer` (sees everything, owns nothing). Parsing and
// display use lowercase words so players appear readably in ruleset JSON
// and recordings.
//
// **Critical constraint: determinism.** Anything that iterates players must
// use `Player::COLORS` order, never a hash map.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of simultaneously playing colors.
pub const PLAYER_MAX: usize = 8;

/// The owner of a tile or unit, or a vision-granting identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// Unowned. Tokens belonging to nobody, e.g. neutral terrain.
    #[default]
    None,
    Red,
    Blue,
    Teal,
    Yellow,
    Pink,
    Indigo,
    Purple,
    Black,
    /// Sees every change, owns nothing, submits no orders.
    Observer,
}

impl Player {
    /// The playable colors in canonical order.
    pub const COLORS: [Player; PLAYER_MAX] = [
        Player::Red,
        Player::Blue,
        Player::Teal,
        Player::Yellow,
        Player::Pink,
        Player::Indigo,
        Player::Purple,
        Player::Black,
    ];

    /// Whether this is a playable color (not `None` or `Observer`).
    pub fn is_color(self) -> bool {
        !matches!(self, Player::None | Player::Observer)
    }

    /// Bit position for vision bitsets. Only valid for playable colors.
    pub fn bit(self) -> Option<usize> {
        Player::COLORS.iter().position(|&p| p == self)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Player::None => "none",
            Player::Red => "red",
            Player::Blue => "blue",
            Player::Teal => "teal",
            Player::Yellow => "yellow",
            Player::Pink => "pink",
            Player::Indigo => "indigo",
            Player::Purple => "purple",
            Player::Black => "black",
            Player::Observer => "observer",
        };
        write!(f, "{word}")
    }
}

impl FromStr for Player {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Player::None),
            "red" => Ok(Player::Red),
            "blue" => Ok(Player::Blue),
            "teal" => Ok(Player::Teal),
            "yellow" => Ok(Player::Yellow),
            "pink" => Ok(Player::Pink),
            "indigo" => Ok(Player::Indigo),
            "purple" => Ok(Player::Purple),
            "black" => Ok(Player::Black),
            "observer" => Ok(Player::Observer),
            _ => Err(ParseError::UnknownPlayer(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_exactly_the_playable_players() {
        assert_eq!(Player::COLORS.len(), PLAYER_MAX);
        for p in Player::COLORS {
            assert!(p.is_color());
        }
        assert!(!Player::None.is_color());
        assert!(!Player::Observer.is_color());
    }

    #[test]
    fn bits_are_unique_and_dense() {
        for (i, p) in Player::COLORS.iter().enumerate() {
            assert_eq!(p.bit(), Some(i));
        }
        assert_eq!(Player::None.bit(), None);
        assert_eq!(Player::Observer.bit(), None);
    }

    #[test]
    fn display_parse_roundtrip() {
        let everyone = [
            Player::None,
            Player::Observer,
            Player::Red,
            Player::Blue,
            Player::Teal,
            Player::Yellow,
            Player::Pink,
            Player::Indigo,
            Player::Purple,
            Player::Black,
        ];
        for p in everyone {
            assert_eq!(p.to_string().parse::<Player>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_word_is_a_parse_error() {
        assert!(matches!(
            "chartreuse".parse::<Player>(),
            Err(ParseError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn serde_uses_lowercase_words() {
        let json = serde_json::to_string(&Player::Teal).unwrap();
        assert_eq!(json, "\"teal\"");
        let back: Player = serde_json::from_str("\"observer\"").unwrap();
        assert_eq!(back, Player::Observer);
    }
}
