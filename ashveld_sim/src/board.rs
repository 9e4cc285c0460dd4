// The board: per-cell match state.
//
// Dense per-cell arrays indexed by the flattened row-major index
// `row * cols + col`, giving O(1) access for every environmental scalar
// (temperature, humidity, chaos, gas, radiation), every hazard marker
// (snow, frostbite, firestorm, bonedrought, death), every token slot
// (tile, ground unit, air unit, bypass unit) and per-cell player vision.
//
// The board mutates through exactly one door: `enact(&Change)`. The
// automaton and the transition passes construct changes, enact them, and
// push them with a vision — never poking arrays directly. Token placement
// during map load goes through `place_tile`/`place_unit`, which also mint
// the per-round-unique token ids used to detect replaced subjects.
//
// `area(from, min, max)` yields the cells whose squared Euclidean distance
// from `from` lies in `[min, max]` — the shape used for ability ranges and
// niceness evaluation. Squared distances only; no floats.
//
// **Critical constraint: determinism.** Re-applying an already-applied
// change is an engine bug, not a tolerated no-op: `enact` debug-asserts
// that every change it applies actually changes something, and logs a
// warning in release builds.

use crate::change::Change;
use crate::position::{Cell, Position};
use crate::token::{
    Descriptor, DescriptorKind, TileToken, TileTokenWithId, TokenId, UnitToken, UnitTokenWithId,
};
use crate::vision::Vision;
use tracing::warn;

/// The mutable per-cell state of a running match.
#[derive(Clone, Debug)]
pub struct Board {
    rows: i16,
    cols: i16,
    tiles: Vec<TileTokenWithId>,
    ground: Vec<UnitTokenWithId>,
    air: Vec<UnitTokenWithId>,
    bypass: Vec<UnitTokenWithId>,
    temperature: Vec<i8>,
    humidity: Vec<i8>,
    chaos: Vec<i8>,
    gas: Vec<i8>,
    radiation: Vec<i8>,
    snow: Vec<bool>,
    frostbite: Vec<bool>,
    firestorm: Vec<bool>,
    bonedrought: Vec<bool>,
    death: Vec<bool>,
    vision: Vec<Vision>,
    next_token_id: u32,
}

/// Flags a change that did not change anything: a double application or a
/// change constructed against stale state. Engine bug either way.
fn enact_mismatch(what: &str, position: Position) {
    warn!(%position, what, "change applied without effect");
    debug_assert!(false, "change applied without effect: {what} at {position}");
}

impl Board {
    pub fn new(rows: i16, cols: i16) -> Self {
        assert!(rows > 0 && cols > 0, "board must have positive dimensions");
        let size = rows as usize * cols as usize;
        Self {
            rows,
            cols,
            tiles: vec![TileTokenWithId::default(); size],
            ground: vec![UnitTokenWithId::default(); size],
            air: vec![UnitTokenWithId::default(); size],
            bypass: vec![UnitTokenWithId::default(); size],
            temperature: vec![0; size],
            humidity: vec![0; size],
            chaos: vec![0; size],
            gas: vec![0; size],
            radiation: vec![0; size],
            snow: vec![false; size],
            frostbite: vec![false; size],
            firestorm: vec![false; size],
            bonedrought: vec![false; size],
            death: vec![false; size],
            vision: vec![Vision::none(); size],
            next_token_id: 1,
        }
    }

    pub fn rows(&self) -> i16 {
        self.rows
    }

    pub fn cols(&self) -> i16 {
        self.cols
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// The validated cell at `pos`, or `None` when out of bounds.
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        if pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols {
            let ix = pos.row as usize * self.cols as usize + pos.col as usize;
            Some(Cell::new(pos, ix))
        } else {
            None
        }
    }

    /// The cell at a flattened index. Panics on out-of-range indices; only
    /// call with indices derived from this board.
    pub fn cell_at(&self, ix: usize) -> Cell {
        assert!(ix < self.size(), "cell index out of range");
        let pos = Position::new(
            (ix / self.cols as usize) as i16,
            (ix % self.cols as usize) as i16,
        );
        Cell::new(pos, ix)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.size()).map(|ix| self.cell_at(ix))
    }

    /// The cells whose squared distance from `from` lies in `[min, max]`.
    ///
    /// Lazy and restartable: each call builds a fresh iterator that scans
    /// only the bounding box of the outer radius.
    pub fn area(&self, from: Cell, min_range_sq: i32, max_range_sq: i32) -> Area<'_> {
        Area::new(self, from, min_range_sq, max_range_sq)
    }

    // --- token access ----------------------------------------------------

    pub fn tile(&self, cell: Cell) -> TileToken {
        self.tiles[cell.ix].token
    }

    pub fn ground(&self, cell: Cell) -> UnitToken {
        self.ground[cell.ix].token
    }

    pub fn air(&self, cell: Cell) -> UnitToken {
        self.air[cell.ix].token
    }

    pub fn bypass(&self, cell: Cell) -> UnitToken {
        self.bypass[cell.ix].token
    }

    /// The unit a descriptor addresses, or the absent token.
    pub fn unit(&self, desc: Descriptor) -> UnitToken {
        let Some(cell) = self.cell(desc.position) else {
            return UnitToken::default();
        };
        match desc.kind {
            DescriptorKind::Ground => self.ground(cell),
            DescriptorKind::Air => self.air(cell),
            DescriptorKind::Bypass => self.bypass(cell),
            DescriptorKind::Tile | DescriptorKind::Cell => UnitToken::default(),
        }
    }

    /// The id of the unit a descriptor addresses.
    pub fn unit_id(&self, desc: Descriptor) -> TokenId {
        let Some(cell) = self.cell(desc.position) else {
            return TokenId::default();
        };
        match desc.kind {
            DescriptorKind::Ground => self.ground[cell.ix].id,
            DescriptorKind::Air => self.air[cell.ix].id,
            DescriptorKind::Bypass => self.bypass[cell.ix].id,
            DescriptorKind::Tile | DescriptorKind::Cell => TokenId::default(),
        }
    }

    // --- scalar access ---------------------------------------------------

    pub fn temperature(&self, cell: Cell) -> i8 {
        self.temperature[cell.ix]
    }

    pub fn humidity(&self, cell: Cell) -> i8 {
        self.humidity[cell.ix]
    }

    pub fn chaos(&self, cell: Cell) -> i8 {
        self.chaos[cell.ix]
    }

    pub fn gas(&self, cell: Cell) -> i8 {
        self.gas[cell.ix]
    }

    pub fn radiation(&self, cell: Cell) -> i8 {
        self.radiation[cell.ix]
    }

    pub fn snow(&self, cell: Cell) -> bool {
        self.snow[cell.ix]
    }

    pub fn frostbite(&self, cell: Cell) -> bool {
        self.frostbite[cell.ix]
    }

    pub fn firestorm(&self, cell: Cell) -> bool {
        self.firestorm[cell.ix]
    }

    pub fn bonedrought(&self, cell: Cell) -> bool {
        self.bonedrought[cell.ix]
    }

    pub fn death(&self, cell: Cell) -> bool {
        self.death[cell.ix]
    }

    // --- vision bookkeeping ----------------------------------------------

    /// The players currently seeing this cell.
    pub fn vision_at(&self, cell: Cell) -> Vision {
        self.vision[cell.ix]
    }

    /// Replace the vision set of a cell. Called by the automaton's vision
    /// recomputation; not part of the change pipeline because who-can-see
    /// is bookkeeping about players, not observable world state.
    pub fn set_vision(&mut self, cell: Cell, vision: Vision) {
        self.vision[cell.ix] = vision;
    }

    // --- direct placement (map load, unit creation) ----------------------

    /// Place a tile, minting a fresh token id. Returns the id.
    pub fn place_tile(&mut self, cell: Cell, token: TileToken) -> TokenId {
        let id = self.mint_id();
        self.tiles[cell.ix] = TileTokenWithId { token, id };
        id
    }

    /// Place a unit in the slot its descriptor kind names.
    pub fn place_unit(&mut self, desc: Descriptor, token: UnitToken) -> TokenId {
        let cell = self
            .cell(desc.position)
            .expect("place_unit requires an in-bounds position");
        let id = self.mint_id();
        let slot = self.unit_slot_mut(desc.kind, cell);
        debug_assert!(slot.token.is_none(), "unit slot already occupied");
        *slot = UnitTokenWithId { token, id };
        id
    }

    fn mint_id(&mut self) -> TokenId {
        let id = TokenId(self.next_token_id);
        self.next_token_id += 1;
        id
    }

    fn unit_slot_mut(&mut self, kind: DescriptorKind, cell: Cell) -> &mut UnitTokenWithId {
        match kind {
            DescriptorKind::Ground => &mut self.ground[cell.ix],
            DescriptorKind::Air => &mut self.air[cell.ix],
            DescriptorKind::Bypass => &mut self.bypass[cell.ix],
            DescriptorKind::Tile | DescriptorKind::Cell => {
                unreachable!("tile/cell descriptors do not name a unit slot")
            }
        }
    }

    // --- enact -----------------------------------------------------------

    /// Apply one change's effect to the grid state. Pure mutation, no
    /// side-channel. Changes with no board effect (announcements,
    /// bookkeeping) are accepted and ignored.
    pub fn enact(&mut self, change: &Change) {
        use Change::*;
        match change {
            Moves { subject, target } => self.enact_move(*subject, *target),
            Died { subject } => {
                let Some(cell) = self.cell(subject.position) else {
                    enact_mismatch("died out of bounds", subject.position);
                    return;
                };
                let slot = self.unit_slot_mut(subject.kind, cell);
                if slot.token.is_none() {
                    enact_mismatch("died with no unit", subject.position);
                    return;
                }
                *slot = UnitTokenWithId::default();
            }
            Destroyed { subject, tile }
            | Transformed { subject, tile }
            | Consumed { subject, tile }
            | Degraded { subject, tile }
            | Desertified { subject, tile }
            | Upgraded { subject, tile }
            | Expanded { subject, tile }
            | Cultivated { subject, tile }
            | Shaped { subject, tile } => {
                let Some(cell) = self.cell(subject.position) else {
                    enact_mismatch("tile change out of bounds", subject.position);
                    return;
                };
                if self.tiles[cell.ix].token == *tile {
                    enact_mismatch("tile change without effect", subject.position);
                    return;
                }
                self.place_tile(cell, *tile);
            }
            Settled { subject, tile } => {
                // The settling unit is consumed and its cell gets the tile.
                let Some(cell) = self.cell(subject.position) else {
                    enact_mismatch("settled out of bounds", subject.position);
                    return;
                };
                let slot = self.unit_slot_mut(subject.kind, cell);
                if slot.token.is_none() {
                    enact_mismatch("settled with no unit", subject.position);
                    return;
                }
                *slot = UnitTokenWithId::default();
                self.place_tile(cell, *tile);
            }
            Produced { subject, unit } => {
                if self.unit(*subject).is_some() {
                    enact_mismatch("produced into occupied slot", subject.position);
                    return;
                }
                self.place_unit(*subject, *unit);
            }
            Captured { subject, player } => {
                let Some(cell) = self.cell(subject.position) else {
                    enact_mismatch("captured out of bounds", subject.position);
                    return;
                };
                if self.tiles[cell.ix].token.owner == *player {
                    enact_mismatch("captured without owner change", subject.position);
                    return;
                }
                self.tiles[cell.ix].token.owner = *player;
            }
            Grows {
                subject,
                stacks,
                power,
            } => {
                let Some(cell) = self.cell(subject.position) else {
                    enact_mismatch("grows out of bounds", subject.position);
                    return;
                };
                let tile = &mut self.tiles[cell.ix].token;
                if tile.stacks == *stacks && tile.power == *power {
                    enact_mismatch("grows without effect", subject.position);
                    return;
                }
                tile.stacks = *stacks;
                tile.power = *power;
            }
            Attacked {
                subject,
                killed,
                depowered,
                ..
            }
            | Trampled {
                subject,
                killed,
                depowered,
            }
            | Shelled {
                subject,
                killed,
                depowered,
            }
            | Bombarded {
                subject,
                killed,
                depowered,
            }
            | Bombed {
                subject,
                killed,
                depowered,
            }
            | Frostbitten {
                subject,
                killed,
                depowered,
            }
            | Burned {
                subject,
                killed,
                depowered,
            }
            | Gassed {
                subject,
                killed,
                depowered,
            }
            | Irradiated {
                subject,
                killed,
                depowered,
            } => self.enact_hit(*subject, *killed, *depowered),
            Snow { subject, value } => self.enact_marker("snow", *subject, *value, |b, ix| {
                &mut b.snow[ix]
            }),
            Frostbite { subject, value } => {
                self.enact_marker("frostbite", *subject, *value, |b, ix| &mut b.frostbite[ix])
            }
            Firestorm { subject, value } => {
                self.enact_marker("firestorm", *subject, *value, |b, ix| &mut b.firestorm[ix])
            }
            Bonedrought { subject, value } => {
                self.enact_marker("bonedrought", *subject, *value, |b, ix| {
                    &mut b.bonedrought[ix]
                })
            }
            Death { subject, value } => {
                self.enact_marker("death", *subject, *value, |b, ix| &mut b.death[ix])
            }
            Gas { subject, value } => {
                self.enact_scalar("gas", *subject, *value, |b, ix| &mut b.gas[ix])
            }
            Radiation { subject, value } => {
                self.enact_scalar("radiation", *subject, *value, |b, ix| &mut b.radiation[ix])
            }
            Temperature { subject, value } => {
                self.enact_scalar("temperature", *subject, *value, |b, ix| {
                    &mut b.temperature[ix]
                })
            }
            Humidity { subject, value } => {
                self.enact_scalar("humidity", *subject, *value, |b, ix| &mut b.humidity[ix])
            }
            Chaos { subject, value } => {
                self.enact_scalar("chaos", *subject, *value, |b, ix| &mut b.chaos[ix])
            }
            // Announcements and bookkeeping: no board effect.
            Starts { .. } | Entered { .. } | Exited { .. } | Survived { .. } | Aims { .. }
            | Attacks { .. } | Tramples { .. } | Shells { .. } | Bombards { .. }
            | Bombs { .. } | Produces { .. } | Settles { .. } | Expands { .. }
            | Upgrades { .. } | Cultivates { .. } | Shapes { .. } | Captures { .. }
            | Reveal { .. } | Obscure { .. } | Phase { .. } | Daytime { .. } | Season { .. }
            | Funds { .. } | Income { .. } | Expenditure { .. } | Ordered { .. }
            | Discarded { .. } | Postponed { .. } | Unfinished { .. } | Resigned { .. }
            | Defeat { .. } | Scored { .. } | Initiative { .. } | GameOver { .. } => {}
        }
    }

    fn enact_move(&mut self, subject: Descriptor, target: Descriptor) {
        let (Some(from), Some(to)) = (self.cell(subject.position), self.cell(target.position))
        else {
            enact_mismatch("move out of bounds", subject.position);
            return;
        };
        let moved = *self.unit_slot_mut(subject.kind, from);
        if moved.token.is_none() {
            enact_mismatch("move with no unit", subject.position);
            return;
        }
        let dest = self.unit_slot_mut(target.kind, to);
        if dest.token.is_some() {
            enact_mismatch("move into occupied slot", target.position);
            return;
        }
        *dest = moved;
        *self.unit_slot_mut(subject.kind, from) = UnitTokenWithId::default();
    }

    fn enact_hit(&mut self, subject: Descriptor, killed: bool, depowered: bool) {
        let Some(cell) = self.cell(subject.position) else {
            enact_mismatch("hit out of bounds", subject.position);
            return;
        };
        match subject.kind {
            DescriptorKind::Tile => {
                let tile = &mut self.tiles[cell.ix].token;
                if killed {
                    if tile.stacks <= 0 {
                        enact_mismatch("hit on empty tile", subject.position);
                        return;
                    }
                    tile.stacks -= 1;
                }
                if depowered {
                    if tile.power <= 0 {
                        enact_mismatch("depower on unpowered tile", subject.position);
                        return;
                    }
                    tile.power -= 1;
                }
            }
            DescriptorKind::Ground | DescriptorKind::Air | DescriptorKind::Bypass => {
                let slot = self.unit_slot_mut(subject.kind, cell);
                if killed {
                    if slot.token.stacks <= 0 {
                        enact_mismatch("hit on empty unit", subject.position);
                        return;
                    }
                    slot.token.stacks -= 1;
                }
            }
            DescriptorKind::Cell => {
                enact_mismatch("hit on bare cell", subject.position);
            }
        }
    }

    fn enact_marker(
        &mut self,
        what: &str,
        subject: Descriptor,
        value: bool,
        slot: impl Fn(&mut Board, usize) -> &mut bool,
    ) {
        let Some(cell) = self.cell(subject.position) else {
            enact_mismatch(what, subject.position);
            return;
        };
        let current = slot(self, cell.ix);
        if *current == value {
            enact_mismatch(what, subject.position);
            return;
        }
        *current = value;
    }

    fn enact_scalar(
        &mut self,
        what: &str,
        subject: Descriptor,
        value: i8,
        slot: impl Fn(&mut Board, usize) -> &mut i8,
    ) {
        let Some(cell) = self.cell(subject.position) else {
            enact_mismatch(what, subject.position);
            return;
        };
        let current = slot(self, cell.ix);
        if *current == value {
            enact_mismatch(what, subject.position);
            return;
        }
        *current = value;
    }
}

/// Lazy iterator over the cells within a squared-distance ring.
///
/// Scans the bounding box of the outer radius and filters by the exact
/// squared-distance bound, so the yielded set matches the brute-force
/// definition cell for cell.
#[derive(Clone, Debug)]
pub struct Area<'a> {
    board: &'a Board,
    center: Position,
    min_range_sq: i32,
    max_range_sq: i32,
    row: i16,
    col: i16,
    row_end: i16,
    col_start: i16,
    col_end: i16,
}

impl<'a> Area<'a> {
    fn new(board: &'a Board, from: Cell, min_range_sq: i32, max_range_sq: i32) -> Self {
        // Integer square root of the outer bound caps the bounding box.
        let radius = isqrt(max_range_sq.max(0)) as i16;
        let center = from.pos;
        let row = (center.row - radius).max(0);
        let row_end = (center.row + radius).min(board.rows - 1);
        let col_start = (center.col - radius).max(0);
        let col_end = (center.col + radius).min(board.cols - 1);
        Self {
            board,
            center,
            min_range_sq,
            max_range_sq,
            row,
            col: col_start,
            row_end,
            col_start,
            col_end,
        }
    }
}

/// Largest `r` with `r * r <= v`. Ranges are tiny; a counting loop is fine.
fn isqrt(v: i32) -> i32 {
    let mut r = 0;
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

impl Iterator for Area<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        while self.row <= self.row_end {
            while self.col <= self.col_end {
                let pos = Position::new(self.row, self.col);
                self.col += 1;
                let d = self.center.squared_distance(pos);
                if d >= self.min_range_sq && d <= self.max_range_sq {
                    // In bounds by bounding-box construction.
                    return self.board.cell(pos);
                }
            }
            self.col = self.col_start;
            self.row += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::token::{TileType, UnitType};

    fn tile(typ: u8, owner: Player, stacks: i8, power: i8) -> TileToken {
        TileToken {
            typ: TileType(typ),
            owner,
            stacks,
            power,
        }
    }

    fn unit(typ: u8, owner: Player, stacks: i8) -> UnitToken {
        UnitToken {
            typ: UnitType(typ),
            owner,
            stacks,
        }
    }

    #[test]
    fn flattened_index_is_row_major() {
        let board = Board::new(13, 20);
        let cell = board.cell(Position::new(12, 19)).unwrap();
        assert_eq!(cell.ix, 259);
        assert_eq!(board.cell_at(259).pos, Position::new(12, 19));
    }

    #[test]
    fn out_of_bounds_positions_have_no_cell() {
        let board = Board::new(4, 4);
        assert!(board.cell(Position::new(-1, 0)).is_none());
        assert!(board.cell(Position::new(0, 4)).is_none());
        assert!(board.cell(Position::new(4, 0)).is_none());
    }

    #[test]
    fn cells_yields_every_cell_once() {
        let board = Board::new(5, 7);
        let cells: Vec<Cell> = board.cells().collect();
        assert_eq!(cells.len(), 35);
        for (ix, cell) in cells.iter().enumerate() {
            assert_eq!(cell.ix, ix);
        }
    }

    /// Area must agree exactly with brute-force enumeration: 20 columns by
    /// 13 rows, center at flattened index 259, range [2, 10].
    #[test]
    fn area_matches_brute_force() {
        let board = Board::new(13, 20);
        let from = board.cell_at(259);
        let (min, max) = (2, 10);

        let inside: Vec<Cell> = board.area(from, min, max).collect();
        for cell in &inside {
            let d = from.pos.squared_distance(cell.pos);
            assert!(d >= min && d <= max, "{} at distance {d}", cell.pos);
        }

        let brute: Vec<Cell> = board
            .cells()
            .filter(|c| {
                let d = from.pos.squared_distance(c.pos);
                d >= min && d <= max
            })
            .collect();
        assert_eq!(inside.len(), brute.len());
        assert_eq!(inside, brute);
    }

    #[test]
    fn area_is_restartable() {
        let board = Board::new(13, 20);
        let from = board.cell_at(100);
        let first: Vec<Cell> = board.area(from, 0, 4).collect();
        let second: Vec<Cell> = board.area(from, 0, 4).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn area_ring_excludes_center_and_inner_cells() {
        let board = Board::new(9, 9);
        let from = board.cell(Position::new(4, 4)).unwrap();
        // Squared distance exactly 1: the four orthogonal neighbors.
        let ring: Vec<Cell> = board.area(from, 1, 1).collect();
        assert_eq!(ring.len(), 4);
        // [1, 2]: orthogonal plus diagonal neighbors.
        let hood: Vec<Cell> = board.area(from, 1, 2).collect();
        assert_eq!(hood.len(), 8);
    }

    #[test]
    fn place_and_read_tokens() {
        let mut board = Board::new(4, 4);
        let cell = board.cell(Position::new(1, 2)).unwrap();
        board.place_tile(cell, tile(3, Player::Red, 2, 1));
        assert_eq!(board.tile(cell).typ, TileType(3));

        let desc = Descriptor::ground(cell.pos);
        let id = board.place_unit(desc, unit(1, Player::Blue, 2));
        assert_eq!(board.unit(desc).owner, Player::Blue);
        assert_eq!(board.unit_id(desc), id);
        // Ids are unique.
        let air_id = board.place_unit(Descriptor::air(cell.pos), unit(2, Player::Blue, 1));
        assert_ne!(id, air_id);
    }

    #[test]
    fn enact_move_relocates_the_unit() {
        let mut board = Board::new(4, 4);
        let from = Position::new(0, 0);
        let to = Position::new(0, 1);
        let id = board.place_unit(Descriptor::ground(from), unit(1, Player::Red, 3));
        board.enact(&Change::Moves {
            subject: Descriptor::ground(from),
            target: Descriptor::ground(to),
        });
        assert!(board.unit(Descriptor::ground(from)).is_none());
        let moved = board.unit(Descriptor::ground(to));
        assert_eq!(moved.stacks, 3);
        // Identity travels with the token.
        assert_eq!(board.unit_id(Descriptor::ground(to)), id);
    }

    #[test]
    fn enact_hit_decrements_and_died_removes() {
        let mut board = Board::new(4, 4);
        let pos = Position::new(2, 2);
        let desc = Descriptor::ground(pos);
        board.place_unit(desc, unit(1, Player::Red, 2));
        board.enact(&Change::Attacked {
            subject: desc,
            attacker: unit(2, Player::Blue, 1),
            killed: true,
            depowered: false,
        });
        assert_eq!(board.unit(desc).stacks, 1);
        board.enact(&Change::Attacked {
            subject: desc,
            attacker: unit(2, Player::Blue, 1),
            killed: true,
            depowered: false,
        });
        assert_eq!(board.unit(desc).stacks, 0);
        board.enact(&Change::Died { subject: desc });
        assert!(board.unit(desc).is_none());
    }

    #[test]
    fn enact_scalar_sets_absolute_value() {
        let mut board = Board::new(4, 4);
        let cell = board.cell(Position::new(1, 1)).unwrap();
        let subject = Descriptor::cell(cell.pos);
        board.enact(&Change::Temperature { subject, value: 12 });
        assert_eq!(board.temperature(cell), 12);
        board.enact(&Change::Gas { subject, value: 2 });
        assert_eq!(board.gas(cell), 2);
    }

    #[test]
    #[should_panic(expected = "change applied without effect")]
    #[cfg(debug_assertions)]
    fn enact_rejects_double_application() {
        let mut board = Board::new(4, 4);
        let subject = Descriptor::cell(Position::new(1, 1));
        let change = Change::Snow {
            subject,
            value: true,
        };
        board.enact(&change);
        // Second application of the same change must be detected.
        board.enact(&change);
    }

    #[test]
    fn enact_capture_changes_owner() {
        let mut board = Board::new(4, 4);
        let cell = board.cell(Position::new(0, 3)).unwrap();
        board.place_tile(cell, tile(5, Player::Red, 1, 0));
        board.enact(&Change::Captured {
            subject: Descriptor::tile(cell.pos),
            player: Player::Blue,
        });
        assert_eq!(board.tile(cell).owner, Player::Blue);
    }

    #[test]
    fn enact_transform_replaces_tile_and_mints_new_id() {
        let mut board = Board::new(4, 4);
        let cell = board.cell(Position::new(1, 0)).unwrap();
        board.place_tile(cell, tile(2, Player::None, 1, 0));
        let before = board.tiles[cell.ix].id;
        board.enact(&Change::Transformed {
            subject: Descriptor::tile(cell.pos),
            tile: tile(6, Player::None, 1, 0),
        });
        assert_eq!(board.tile(cell).typ, TileType(6));
        assert_ne!(board.tiles[cell.ix].id, before);
    }

    #[test]
    fn vision_bookkeeping() {
        let mut board = Board::new(4, 4);
        let cell = board.cell(Position::new(3, 3)).unwrap();
        assert!(board.vision_at(cell).is_empty());
        board.set_vision(cell, Vision::only(Player::Pink));
        assert!(board.vision_at(cell).contains(Player::Pink));
    }
}
