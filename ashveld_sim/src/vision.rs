// Vision: the set of players entitled to observe a change.
//
// Every change pushed into a changeset carries a `Vision`. A player outside
// the set never receives the change — per-player filtering happens in
// `ChangeSet::for_player` (see `change.rs`) and nowhere else, so this type
// is the single gatekeeper of information hiding.
//
// Observers implicitly see everything; they are not stored in the bitset.
//
// Serialized as a JSON array of player words so recordings stay readable.

use crate::player::{PLAYER_MAX, Player};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A set of players permitted to observe a change. One bit per color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vision {
    bits: u8,
}

impl Vision {
    /// Nobody (except observers).
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    /// Exactly one player.
    pub fn only(player: Player) -> Self {
        let mut v = Self::none();
        v.add(player);
        v
    }

    /// All of the given players.
    pub fn all(players: &[Player]) -> Self {
        let mut v = Self::none();
        for &p in players {
            v.add(p);
        }
        v
    }

    /// Add a player. Adding `None` or `Observer` is a no-op: `None` never
    /// receives changes and observers always do.
    pub fn add(&mut self, player: Player) {
        if let Some(bit) = player.bit() {
            self.bits |= 1 << bit;
        }
    }

    pub fn remove(&mut self, player: Player) {
        if let Some(bit) = player.bit() {
            self.bits &= !(1 << bit);
        }
    }

    /// Whether `player` may observe a change carrying this vision.
    pub fn contains(&self, player: Player) -> bool {
        match player.bit() {
            Some(bit) => self.bits & (1 << bit) != 0,
            None => player == Player::Observer,
        }
    }

    /// Union with another vision set.
    pub fn union(self, other: Vision) -> Vision {
        Vision {
            bits: self.bits | other.bits,
        }
    }

    /// True if no color is present.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// The colors present, in canonical order.
    pub fn players(&self) -> impl Iterator<Item = Player> + '_ {
        Player::COLORS
            .iter()
            .copied()
            .filter(move |p| self.contains(*p))
    }
}

impl fmt::Display for Vision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for p in self.players() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

impl Serialize for Vision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let players: Vec<Player> = self.players().collect();
        players.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Vision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let players = Vec::<Player>::deserialize(deserializer)?;
        if players.len() > PLAYER_MAX {
            return Err(D::Error::custom("too many players in vision set"));
        }
        Ok(Vision::all(&players))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_empty_but_observer_sees() {
        let v = Vision::none();
        assert!(v.is_empty());
        for p in Player::COLORS {
            assert!(!v.contains(p));
        }
        assert!(v.contains(Player::Observer));
        assert!(!v.contains(Player::None));
    }

    #[test]
    fn only_and_contains() {
        let v = Vision::only(Player::Teal);
        assert!(v.contains(Player::Teal));
        assert!(!v.contains(Player::Red));
        assert!(v.contains(Player::Observer));
    }

    #[test]
    fn adding_none_or_observer_is_noop() {
        let mut v = Vision::none();
        v.add(Player::None);
        v.add(Player::Observer);
        assert!(v.is_empty());
    }

    #[test]
    fn union_combines() {
        let v = Vision::only(Player::Red).union(Vision::only(Player::Blue));
        assert!(v.contains(Player::Red));
        assert!(v.contains(Player::Blue));
        assert!(!v.contains(Player::Black));
    }

    #[test]
    fn players_in_canonical_order() {
        let v = Vision::all(&[Player::Black, Player::Red, Player::Pink]);
        let order: Vec<Player> = v.players().collect();
        assert_eq!(order, vec![Player::Red, Player::Pink, Player::Black]);
    }

    #[test]
    fn serde_as_word_array() {
        let v = Vision::all(&[Player::Red, Player::Blue]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[\"red\",\"blue\"]");
        let back: Vision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
