// Changes: the atomic observable events of a match.
//
// Every mutation of match state is described by exactly one `Change` — a
// small tagged record carrying the mutation plus enough context for a
// client to animate it. Changes follow a three-step discipline everywhere:
// construct the change, `board.enact()` it, then push `(change, vision)`
// onto the active `ChangeSet`. The automaton wraps those steps in a single
// call (`Automaton::record_change`) so vision is always captured before the
// mutation alters who can see what.
//
// A `ChangeSet` is an ordered list of (change, vision) pairs forming one
// real-time-indivisible moment. Clients receive per-player filtered views;
// the filter strips changes whose vision excludes the player and preserves
// relative order.
//
// Environmental scalar changes (`Temperature`, `Gas`, …) carry the new
// absolute value, not a delta. The board only emits a change when the value
// actually differs, which lets `enact` treat "value already equal" as a
// double-application bug.
//
// **Critical constraint: determinism.** A recorded match replays by
// re-enacting these changes byte for byte; nothing observable may happen
// outside of a Change.

use crate::notice::Notice;
use crate::order::Order;
use crate::player::Player;
use crate::position::Position;
use crate::season::{Daytime, Phase, Season};
use crate::token::{Descriptor, TileToken, UnitToken};
use crate::vision::Vision;
use serde::{Deserialize, Serialize};

/// One atomic observable event. Immutable once pushed into a changeset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    // --- movement and unit lifecycle -----------------------------------
    /// A unit begins executing its move order.
    Starts { subject: Descriptor },
    /// A unit steps from `subject` to `target`.
    Moves {
        subject: Descriptor,
        target: Descriptor,
    },
    /// A unit becomes visible to the receiving players.
    Entered {
        subject: Descriptor,
        unit: UnitToken,
    },
    /// A unit stops being visible to the receiving players.
    Exited { subject: Descriptor },
    /// A unit dies.
    Died { subject: Descriptor },
    /// A tile is destroyed and replaced.
    Destroyed {
        subject: Descriptor,
        tile: TileToken,
    },
    /// A unit survived the attack that just resolved against it.
    Survived { subject: Descriptor },

    // --- combat --------------------------------------------------------
    /// The subject takes aim at the target.
    Aims {
        subject: Descriptor,
        target: Descriptor,
    },
    /// The subject fires its regular attack at the target.
    Attacks {
        subject: Descriptor,
        target: Descriptor,
    },
    /// One attack hit lands on the subject.
    Attacked {
        subject: Descriptor,
        attacker: UnitToken,
        killed: bool,
        depowered: bool,
    },
    /// The subject walks over and crushes the target tile.
    Tramples {
        subject: Descriptor,
        target: Descriptor,
    },
    /// One trample hit lands on the subject.
    Trampled {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// The subject fires a shell at the target cell.
    Shells {
        subject: Descriptor,
        target: Descriptor,
    },
    /// One shell hit lands on the subject.
    Shelled {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// The subject opens a bombardment volley at the target cell.
    Bombards {
        subject: Descriptor,
        target: Descriptor,
    },
    /// One bombardment hit lands on the subject.
    Bombarded {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// The subject drops its payload on the cell below.
    Bombs {
        subject: Descriptor,
        target: Descriptor,
    },
    /// One bomb hit lands on the subject.
    Bombed {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },

    // --- hazards -------------------------------------------------------
    /// Frostbite damage lands on the subject.
    Frostbitten {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// Firestorm damage lands on the subject.
    Burned {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// Gas damage lands on the subject.
    Gassed {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },
    /// Radiation damage lands on the subject.
    Irradiated {
        subject: Descriptor,
        killed: bool,
        depowered: bool,
    },

    // --- construction and economy --------------------------------------
    /// The subject tile starts training a unit.
    Produces {
        subject: Descriptor,
        unit: crate::token::UnitType,
    },
    /// A freshly trained unit appears at the target.
    Produced {
        subject: Descriptor,
        unit: UnitToken,
    },
    /// The subject unit starts settling.
    Settles {
        subject: Descriptor,
        tile: crate::token::TileType,
    },
    /// The subject unit is consumed and replaced by a new tile.
    Settled {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile starts expanding toward the target cell.
    Expands {
        subject: Descriptor,
        target: Descriptor,
        tile: crate::token::TileType,
    },
    /// A new tile appears on the expanded cell.
    Expanded {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile starts upgrading itself.
    Upgrades {
        subject: Descriptor,
        tile: crate::token::TileType,
    },
    /// The subject tile finishes upgrading.
    Upgraded {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile starts sowing its surroundings.
    Cultivates {
        subject: Descriptor,
        tile: crate::token::TileType,
    },
    /// A sown tile appears on the subject cell.
    Cultivated {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject unit starts shaping its own cell.
    Shapes {
        subject: Descriptor,
        tile: crate::token::TileType,
    },
    /// A shaped tile appears on the subject cell.
    Shaped {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject unit begins capturing the tile it stands on.
    Captures {
        subject: Descriptor,
        target: Descriptor,
    },
    /// The subject tile changes owner.
    Captured {
        subject: Descriptor,
        player: Player,
    },

    // --- environment ---------------------------------------------------
    /// Snow marker set or cleared on the subject cell.
    Snow { subject: Descriptor, value: bool },
    /// Frostbite marker set or cleared on the subject cell.
    Frostbite { subject: Descriptor, value: bool },
    /// Firestorm marker set or cleared on the subject cell.
    Firestorm { subject: Descriptor, value: bool },
    /// Bonedrought marker set or cleared on the subject cell.
    Bonedrought { subject: Descriptor, value: bool },
    /// Death marker set or cleared on the subject cell.
    Death { subject: Descriptor, value: bool },
    /// Gas stacks on the subject cell change to the new absolute value.
    Gas { subject: Descriptor, value: i8 },
    /// Radiation stacks on the subject cell change to the new value.
    Radiation { subject: Descriptor, value: i8 },
    /// Temperature on the subject cell changes to the new value.
    Temperature { subject: Descriptor, value: i8 },
    /// Humidity on the subject cell changes to the new value.
    Humidity { subject: Descriptor, value: i8 },
    /// Chaos on the subject cell changes to the new value.
    Chaos { subject: Descriptor, value: i8 },
    /// A powered building gains stacks or power.
    Grows {
        subject: Descriptor,
        stacks: i8,
        power: i8,
    },
    /// The subject tile transforms into another type (regrowth).
    Transformed {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile is consumed by firestorm.
    Consumed {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile degrades (loses fertility).
    Degraded {
        subject: Descriptor,
        tile: TileToken,
    },
    /// The subject tile turns to desert.
    Desertified {
        subject: Descriptor,
        tile: TileToken,
    },

    // --- information ---------------------------------------------------
    /// Full disclosure of a cell gained into vision.
    Reveal {
        subject: Descriptor,
        tile: TileToken,
        snow: bool,
        frostbite: bool,
        firestorm: bool,
        bonedrought: bool,
        death: bool,
        gas: i8,
        radiation: i8,
        temperature: i8,
        humidity: i8,
        chaos: i8,
    },
    /// A cell leaves the receiving players' vision.
    Obscure { subject: Descriptor },

    // --- bookkeeping ---------------------------------------------------
    /// The match enters a new phase.
    Phase { phase: Phase },
    /// The growth phase flips between early and late.
    Daytime { daytime: Daytime },
    /// The season advances.
    Season { season: Season },
    /// A player's balance becomes the new absolute amount.
    Funds { player: Player, money: i32 },
    /// A player receives income.
    Income { player: Player, amount: i32 },
    /// A player pays for an order.
    Expenditure { player: Player, amount: i32 },
    /// An order was accepted during planning. Private to the issuer; the
    /// replay path recovers submitted orders from these.
    Ordered { player: Player, order: Order },
    /// An order was dropped as invalid, with the private reason.
    Discarded {
        subject: Descriptor,
        notice: Notice,
    },
    /// An order was retained and will be retried next round.
    Postponed {
        subject: Descriptor,
        notice: Notice,
    },
    /// An order partially executed; the remainder was retained.
    Unfinished {
        subject: Descriptor,
        order: Order,
    },
    /// A player resigned.
    Resigned { player: Player },
    /// A player is defeated.
    Defeat { player: Player, score: i32 },
    /// A player's final score.
    Scored { player: Player, score: i32 },
    /// The staging phase reveals a player's initiative position.
    Initiative { player: Player, position: i8 },
    /// The match has ended with the aggregate score.
    GameOver { score: i32 },
}

impl Change {
    /// The cell position this change is anchored to, if any. Bookkeeping
    /// changes (phase, funds, …) have no anchor.
    pub fn position(&self) -> Option<Position> {
        use Change::*;
        match self {
            Starts { subject }
            | Moves { subject, .. }
            | Entered { subject, .. }
            | Exited { subject }
            | Died { subject }
            | Destroyed { subject, .. }
            | Survived { subject }
            | Aims { subject, .. }
            | Attacks { subject, .. }
            | Attacked { subject, .. }
            | Tramples { subject, .. }
            | Trampled { subject, .. }
            | Shells { subject, .. }
            | Shelled { subject, .. }
            | Bombards { subject, .. }
            | Bombarded { subject, .. }
            | Bombs { subject, .. }
            | Bombed { subject, .. }
            | Frostbitten { subject, .. }
            | Burned { subject, .. }
            | Gassed { subject, .. }
            | Irradiated { subject, .. }
            | Produces { subject, .. }
            | Produced { subject, .. }
            | Settles { subject, .. }
            | Settled { subject, .. }
            | Expands { subject, .. }
            | Expanded { subject, .. }
            | Upgrades { subject, .. }
            | Upgraded { subject, .. }
            | Cultivates { subject, .. }
            | Cultivated { subject, .. }
            | Shapes { subject, .. }
            | Shaped { subject, .. }
            | Captures { subject, .. }
            | Captured { subject, .. }
            | Snow { subject, .. }
            | Frostbite { subject, .. }
            | Firestorm { subject, .. }
            | Bonedrought { subject, .. }
            | Death { subject, .. }
            | Gas { subject, .. }
            | Radiation { subject, .. }
            | Temperature { subject, .. }
            | Humidity { subject, .. }
            | Chaos { subject, .. }
            | Grows { subject, .. }
            | Transformed { subject, .. }
            | Consumed { subject, .. }
            | Degraded { subject, .. }
            | Desertified { subject, .. }
            | Reveal { subject, .. }
            | Obscure { subject }
            | Discarded { subject, .. }
            | Postponed { subject, .. }
            | Unfinished { subject, .. } => Some(subject.position),
            Phase { .. } | Daytime { .. } | Season { .. } | Funds { .. } | Income { .. }
            | Expenditure { .. } | Ordered { .. } | Resigned { .. } | Defeat { .. }
            | Scored { .. } | Initiative { .. } | GameOver { .. } => None,
        }
    }
}

/// An ordered sequence of (change, vision) pairs forming one indivisible
/// moment of match time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

/// One change together with who may observe it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub change: Change,
    pub vision: Vision,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change with its vision. The vision must have been computed
    /// before the change's mutation was enacted.
    pub fn push(&mut self, change: Change, vision: Vision) {
        self.entries.push(ChangeEntry { change, vision });
    }

    /// Append every entry of `other`, preserving order.
    pub fn append(&mut self, other: ChangeSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// The changes `player` is entitled to see, relative order preserved.
    pub fn for_player(&self, player: Player) -> Vec<&Change> {
        self.entries
            .iter()
            .filter(|e| e.vision.contains(player))
            .map(|e| &e.change)
            .collect()
    }

    /// Structural equality, used to verify a recomputed changeset against
    /// the recorded one during order replay.
    pub fn equal(&self, other: &ChangeSet) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TileType;

    fn at(row: i16, col: i16) -> Descriptor {
        Descriptor::ground(Position::new(row, col))
    }

    #[test]
    fn filtered_view_preserves_order_and_strips_hidden() {
        let mut set = ChangeSet::new();
        set.push(
            Change::Starts { subject: at(0, 0) },
            Vision::all(&[Player::Red, Player::Blue]),
        );
        set.push(
            Change::Funds {
                player: Player::Red,
                money: 20,
            },
            Vision::only(Player::Red),
        );
        set.push(
            Change::Phase {
                phase: Phase::Action,
            },
            Vision::all(&[Player::Red, Player::Blue]),
        );

        let red = set.for_player(Player::Red);
        assert_eq!(red.len(), 3);
        let blue = set.for_player(Player::Blue);
        assert_eq!(blue.len(), 2);
        assert!(matches!(blue[0], Change::Starts { .. }));
        assert!(matches!(blue[1], Change::Phase { .. }));
        // Observers see everything.
        assert_eq!(set.for_player(Player::Observer).len(), 3);
    }

    #[test]
    fn vision_monotonicity_excluded_player_sees_nothing() {
        let mut set = ChangeSet::new();
        set.push(Change::Died { subject: at(2, 2) }, Vision::only(Player::Red));
        assert!(set.for_player(Player::Teal).is_empty());
    }

    #[test]
    fn changeset_json_roundtrip() {
        let mut set = ChangeSet::new();
        set.push(
            Change::Moves {
                subject: at(1, 1),
                target: at(1, 2),
            },
            Vision::all(&[Player::Red]),
        );
        set.push(
            Change::Transformed {
                subject: Descriptor::tile(Position::new(4, 4)),
                tile: TileToken {
                    typ: TileType(2),
                    owner: Player::None,
                    stacks: 1,
                    power: 0,
                },
            },
            Vision::none(),
        );
        let json = serde_json::to_string(&set).unwrap();
        let back: ChangeSet = serde_json::from_str(&json).unwrap();
        assert!(set.equal(&back));
    }

    #[test]
    fn changeset_serializes_as_entry_array() {
        let mut set = ChangeSet::new();
        set.push(
            Change::Season {
                season: Season::Winter,
            },
            Vision::none(),
        );
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['), "got {json}");
        assert!(json.contains("\"change\""));
        assert!(json.contains("\"vision\""));
    }

    #[test]
    fn ordered_change_embeds_the_order() {
        use crate::order::Order;
        use smallvec::smallvec;
        let change = Change::Ordered {
            player: Player::Blue,
            order: Order::Move {
                subject: at(0, 0),
                moves: smallvec![Position::new(0, 1)],
            },
        };
        let json = serde_json::to_string(&change).unwrap();
        let back: Change = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }

    #[test]
    fn positions_anchor_cell_changes_only() {
        assert_eq!(
            Change::Died { subject: at(3, 7) }.position(),
            Some(Position::new(3, 7))
        );
        assert_eq!(
            Change::GameOver { score: 40 }.position(),
            None
        );
    }
}
