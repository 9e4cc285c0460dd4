// Tokens: the values that occupy board cells.
//
// A `TileToken` is the terrain/building in a cell; a `UnitToken` is a
// ground or air unit standing on it. A token whose type is the absent type
// (code 0) is falsy and means "nothing here" — the board stores plain
// tokens everywhere and absence is in-band, never `Option`.
//
// The `*WithId` variants add a per-round-unique `TokenId` used during order
// resolution to detect that an order's subject was replaced or killed
// between validation and execution (a verified subject can die to an
// attack of opportunity mid-move, for example).
//
// A `Descriptor` is a tagged reference to a game object by position: the
// tile, the ground unit, the air unit, the bypass slot (a unit passing
// through a cell occupied by another friendly unit), or the bare cell.

use crate::error::ParseError;
use crate::player::Player;
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tile type code. 0 is the absent type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileType(pub u8);

/// A unit type code. 0 is the absent type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitType(pub u8);

impl TileType {
    pub const NONE: TileType = TileType(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl UnitType {
    pub const NONE: UnitType = UnitType(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

/// Per-round-unique identifier for a live token on the board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u32);

/// The terrain or building occupying a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileToken {
    #[serde(rename = "type")]
    pub typ: TileType,
    pub owner: Player,
    pub stacks: i8,
    pub power: i8,
}

impl TileToken {
    pub fn is_none(&self) -> bool {
        self.typ.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.typ.is_some()
    }
}

/// A ground or air unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitToken {
    #[serde(rename = "type")]
    pub typ: UnitType,
    pub owner: Player,
    pub stacks: i8,
}

impl UnitToken {
    pub fn is_none(&self) -> bool {
        self.typ.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.typ.is_some()
    }
}

/// A live tile with its identity. Board storage only; never serialized into
/// changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileTokenWithId {
    pub token: TileToken,
    pub id: TokenId,
}

/// A live unit with its identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitTokenWithId {
    pub token: UnitToken,
    pub id: TokenId,
}

/// Which object in a cell a descriptor addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Tile,
    Ground,
    Air,
    /// A unit moving through a cell occupied by another friendly unit.
    Bypass,
    Cell,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            DescriptorKind::Tile => "tile",
            DescriptorKind::Ground => "ground",
            DescriptorKind::Air => "air",
            DescriptorKind::Bypass => "bypass",
            DescriptorKind::Cell => "cell",
        };
        write!(f, "{word}")
    }
}

impl FromStr for DescriptorKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tile" => Ok(DescriptorKind::Tile),
            "ground" => Ok(DescriptorKind::Ground),
            "air" => Ok(DescriptorKind::Air),
            "bypass" => Ok(DescriptorKind::Bypass),
            "cell" => Ok(DescriptorKind::Cell),
            _ => Err(ParseError::UnknownDescriptor(s.to_string())),
        }
    }
}

/// A tagged reference to a game object at a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub position: Position,
}

impl Descriptor {
    pub const fn tile(position: Position) -> Self {
        Self {
            kind: DescriptorKind::Tile,
            position,
        }
    }

    pub const fn ground(position: Position) -> Self {
        Self {
            kind: DescriptorKind::Ground,
            position,
        }
    }

    pub const fn air(position: Position) -> Self {
        Self {
            kind: DescriptorKind::Air,
            position,
        }
    }

    pub const fn bypass(position: Position) -> Self {
        Self {
            kind: DescriptorKind::Bypass,
            position,
        }
    }

    pub const fn cell(position: Position) -> Self {
        Self {
            kind: DescriptorKind::Cell,
            position,
        }
    }

    /// Whether this descriptor addresses a unit slot (ground, air, bypass).
    pub fn is_unit(self) -> bool {
        matches!(
            self.kind,
            DescriptorKind::Ground | DescriptorKind::Air | DescriptorKind::Bypass
        )
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_type_is_falsy() {
        assert!(TileType::NONE.is_none());
        assert!(TileType(3).is_some());
        assert!(UnitToken::default().is_none());
        let unit = UnitToken {
            typ: UnitType(1),
            owner: Player::Red,
            stacks: 2,
        };
        assert!(unit.is_some());
    }

    #[test]
    fn tokens_serialize_with_type_key() {
        let tile = TileToken {
            typ: TileType(4),
            owner: Player::Blue,
            stacks: 1,
            power: 2,
        };
        let json = serde_json::to_string(&tile).unwrap();
        assert!(json.contains("\"type\":4"), "got {json}");
        let back: TileToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tile);
    }

    #[test]
    fn descriptor_kinds_roundtrip() {
        for kind in [
            DescriptorKind::Tile,
            DescriptorKind::Ground,
            DescriptorKind::Air,
            DescriptorKind::Bypass,
            DescriptorKind::Cell,
        ] {
            assert_eq!(kind.to_string().parse::<DescriptorKind>().unwrap(), kind);
        }
        assert!("sky".parse::<DescriptorKind>().is_err());
    }

    #[test]
    fn descriptor_unit_slots() {
        let p = Position::new(1, 2);
        assert!(Descriptor::ground(p).is_unit());
        assert!(Descriptor::air(p).is_unit());
        assert!(Descriptor::bypass(p).is_unit());
        assert!(!Descriptor::tile(p).is_unit());
        assert!(!Descriptor::cell(p).is_unit());
    }
}
