// Player orders.
//
// An `Order` is the only external input to a running match: players submit
// them during the planning phase and the automaton executes them one at a
// time during the action phase. Each variant carries only the fields that
// order kind needs — the subject being ordered, a target cell, the waypoint
// list of a move, or the type to build.
//
// Orders are player-owned until consumed. Processing an order resolves it
// into exactly one of four dispositions (see `Disposition`): finished,
// discarded, postponed, or unfinished. An order never fails with an error;
// invalid orders are silently dropped with an optional private notice.
//
// See also: `automaton.rs` for validation and execution, `change.rs` for
// the `Ordered`/`Unfinished` changes that carry orders inside recordings.

use crate::position::Position;
use crate::token::{Descriptor, TileType, UnitType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The waypoints of a move order. Small moves stay inline.
pub type MoveList = SmallVec<[Position; 8]>;

/// An instruction issued by a player to one of their tiles or units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Order {
    /// Walk the subject along a list of adjacent waypoints.
    Move {
        subject: Descriptor,
        moves: MoveList,
    },
    /// Attack an adjacent cell whenever an enemy holds it.
    Guard {
        subject: Descriptor,
        target: Position,
    },
    /// Concentrate attacks on one adjacent cell.
    Focus {
        subject: Descriptor,
        target: Position,
    },
    /// Pin enemy ground units in an adjacent cell, attacking them if they
    /// try to leave.
    Lockdown {
        subject: Descriptor,
        target: Position,
    },
    /// Fire an explosive shell at a cell in range.
    Shell {
        subject: Descriptor,
        target: Position,
    },
    /// Sustained long-range bombardment of a cell in range.
    Bombard {
        subject: Descriptor,
        target: Position,
    },
    /// Drop the subject's payload on the cell below it.
    Bomb { subject: Descriptor },
    /// Take ownership of the tile the subject stands on.
    Capture { subject: Descriptor },
    /// Build a tile of the given type on the subject's own cell.
    Shape {
        subject: Descriptor,
        tile: TileType,
    },
    /// Replace the subject unit with a tile of the given type.
    Settle {
        subject: Descriptor,
        tile: TileType,
    },
    /// Build a tile of the given type on a nearby cell.
    Expand {
        subject: Descriptor,
        target: Position,
        tile: TileType,
    },
    /// Replace the subject tile with a tile of the given type.
    Upgrade {
        subject: Descriptor,
        tile: TileType,
    },
    /// Sow tiles of the given type on all suitable surrounding cells.
    Cultivate {
        subject: Descriptor,
        tile: TileType,
    },
    /// Train a unit of the given type onto a nearby cell.
    Produce {
        subject: Descriptor,
        target: Position,
        unit: UnitType,
    },
    /// Cancel the subject's retained order.
    Halt { subject: Descriptor },
}

impl Order {
    /// The object this order is about.
    pub fn subject(&self) -> Descriptor {
        match self {
            Order::Move { subject, .. }
            | Order::Guard { subject, .. }
            | Order::Focus { subject, .. }
            | Order::Lockdown { subject, .. }
            | Order::Shell { subject, .. }
            | Order::Bombard { subject, .. }
            | Order::Bomb { subject }
            | Order::Capture { subject }
            | Order::Shape { subject, .. }
            | Order::Settle { subject, .. }
            | Order::Expand { subject, .. }
            | Order::Upgrade { subject, .. }
            | Order::Cultivate { subject, .. }
            | Order::Produce { subject, .. }
            | Order::Halt { subject } => *subject,
        }
    }
}

/// The four terminal outcomes of one order-processing attempt.
///
/// Every validation branch of every order kind funnels into exactly one of
/// these; an order never vanishes without a disposition and never receives
/// two.
#[derive(Clone, Debug, PartialEq)]
pub enum Disposition {
    /// The order ran to completion and is cleared.
    Finished,
    /// The order was invalid and has been dropped.
    Discarded,
    /// The order is valid but currently blocked; it is retained unchanged
    /// and retried next round.
    Postponed,
    /// The order partially executed; the rewritten remainder is retained
    /// and retried next round.
    Unfinished(Order),
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn subject_is_extractable_from_every_kind() {
        let subject = Descriptor::ground(Position::new(3, 4));
        let tile_subject = Descriptor::tile(Position::new(1, 1));
        let orders = vec![
            Order::Move {
                subject,
                moves: smallvec![Position::new(3, 5)],
            },
            Order::Guard {
                subject,
                target: Position::new(3, 5),
            },
            Order::Bomb { subject },
            Order::Capture { subject },
            Order::Produce {
                subject: tile_subject,
                target: Position::new(1, 2),
                unit: UnitType(2),
            },
            Order::Halt { subject },
        ];
        assert_eq!(orders[0].subject(), subject);
        assert_eq!(orders[4].subject(), tile_subject);
    }

    #[test]
    fn json_roundtrip() {
        let order = Order::Move {
            subject: Descriptor::ground(Position::new(0, 0)),
            moves: smallvec![Position::new(0, 1), Position::new(0, 2)],
        };
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"type\":\"move\""), "got {json}");
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn json_tags_are_lowercase_kind_words() {
        let order = Order::Shell {
            subject: Descriptor::ground(Position::new(2, 2)),
            target: Position::new(2, 5),
        };
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"type\":\"shell\""));
    }
}
