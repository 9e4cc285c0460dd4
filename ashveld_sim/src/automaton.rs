// The automaton: the top-level turn state machine.
//
// One automaton per match. It owns the board, the bible, the RNG stream,
// per-player ledgers (money, standing orders, defeat state), the queue of
// pending changesets and the recording buffer, and it is the only code
// that mutates any of them. One call into `act`/`receive`/`resign` runs to
// completion before another is permitted; there is no suspension point.
//
// A round walks Growth → Resting → Planning → Staging → Action → Decay.
// Resting and Planning are wait states (`active()` is false there): the
// host opens planning with one `act()` call, players submit orders through
// `receive`, and a second `act()` closes planning, after which the round
// runs itself to the next Resting. Every `act()` returns exactly one
// changeset — one indivisible moment — and appends it to the recording.
//
// Order processing resolves every order into exactly one of the four
// dispositions (finished, discarded, postponed, unfinished), never an
// error. All mutation goes through `emit`, which enacts a change on the
// board and pushes it with a vision computed before the mutation.
//
// Replay drives the same machine from a recording: `ReplayMode::FromChanges`
// blindly re-applies the recorded changes, `ReplayMode::FromOrders` feeds
// the recorded submissions back through the live path and asserts the
// recomputed changeset equals the recorded one — the engine's core
// correctness contract.
//
// **Critical constraint: determinism.** Player iteration uses canonical
// color order or the shuffled initiative list, cell iteration is row-major
// or a seeded `Randomizer` draw, and every random decision draws from the
// single match RNG.

use crate::bible::Bible;
use crate::board::Board;
use crate::change::{Change, ChangeSet};
use crate::damage::{self, Attacker, Background, Hit, Taker};
use crate::error::LoadError;
use crate::map::Map;
use crate::notice::Notice;
use crate::order::{Disposition, MoveList, Order};
use crate::player::Player;
use crate::position::{Cell, Position};
use crate::randomizer::Randomizer;
use crate::recording::{Metadata, Recording};
use crate::season::{Daytime, Phase, Season};
use crate::token::{Descriptor, DescriptorKind, TileToken, TileType, UnitToken, UnitType};
use crate::transition::{
    ChaosEmission, GasDiffusion, MarkerDerivation, PowerGrowth, RadiationDiffusion, Transform,
    Weather,
};
use crate::version::Version;
use crate::vision::Vision;
use ashveld_prng::MatchRng;
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// How a recording is replayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayMode {
    /// Re-apply the recorded changes without recomputation. Viewing only;
    /// the match cannot continue live afterwards.
    FromChanges,
    /// Feed the recorded orders back through the live path and assert the
    /// recomputed changesets equal the recorded ones. The match can
    /// continue live from wherever the recording ends.
    FromOrders,
}

struct Replay {
    mode: ReplayMode,
    sets: VecDeque<ChangeSet>,
}

/// Per-player economic and order state.
#[derive(Clone, Debug, Default)]
struct Ledger {
    money: i32,
    /// Standing orders: new submissions plus postponed/unfinished remainders.
    orders: Vec<Order>,
    resigned: bool,
    defeated: bool,
}

/// Which change variant a resolved hit turns into.
#[derive(Clone, Copy, Debug)]
enum HitKind {
    Attacked,
    Trampled,
    Shelled,
    Bombarded,
    Bombed,
    Frostbitten,
    Burned,
    Gassed,
    Irradiated,
}

fn hit_change(kind: HitKind, hit: &Hit) -> Change {
    let subject = hit.subject;
    let killed = hit.killing;
    let depowered = hit.depowering;
    match kind {
        HitKind::Attacked => Change::Attacked {
            subject,
            attacker: hit.attacker,
            killed,
            depowered,
        },
        HitKind::Trampled => Change::Trampled {
            subject,
            killed,
            depowered,
        },
        HitKind::Shelled => Change::Shelled {
            subject,
            killed,
            depowered,
        },
        HitKind::Bombarded => Change::Bombarded {
            subject,
            killed,
            depowered,
        },
        HitKind::Bombed => Change::Bombed {
            subject,
            killed,
            depowered,
        },
        HitKind::Frostbitten => Change::Frostbitten {
            subject,
            killed,
            depowered,
        },
        HitKind::Burned => Change::Burned {
            subject,
            killed,
            depowered,
        },
        HitKind::Gassed => Change::Gassed {
            subject,
            killed,
            depowered,
        },
        HitKind::Irradiated => Change::Irradiated {
            subject,
            killed,
            depowered,
        },
    }
}

/// One match. Created at match start, destroyed at match end; mutated only
/// through its own methods.
pub struct Automaton {
    bible: Bible,
    board: Board,
    players: Vec<Player>,
    ledgers: BTreeMap<Player, Ledger>,
    phase: Phase,
    daytime: Daytime,
    season: Season,
    round: u32,
    rng: MatchRng,
    initiative: Vec<Player>,
    queues: BTreeMap<Player, VecDeque<Order>>,
    play_queue: VecDeque<Player>,
    pending: VecDeque<ChangeSet>,
    recording: Recording,
    replay: Option<Replay>,
    over: bool,
}

impl Automaton {
    // --- construction ----------------------------------------------------

    pub fn new(players: Vec<Player>, bible: Bible, map: &Map, seed: u64) -> Automaton {
        let mut colors: Vec<Player> = Vec::new();
        for player in players {
            if player.is_color() && !colors.contains(&player) {
                colors.push(player);
            }
        }

        let mut board = Board::new(map.rows, map.cols);
        for (ix, spec) in map.cells.iter().enumerate() {
            let cell = board.cell_at(ix);
            let typ = bible.tile_type(&spec.tile);
            if typ.is_some() {
                let owner = if bible.tile_ownable[typ] {
                    spec.owner
                } else {
                    Player::None
                };
                board.place_tile(
                    cell,
                    TileToken {
                        typ,
                        owner,
                        stacks: bible.tile_stacks_built[typ].max(1) as i8,
                        power: bible.tile_power_built[typ] as i8,
                    },
                );
            }
            if let Some(word) = &spec.unit {
                let utyp = bible.unit_type(word);
                if utyp.is_some() && spec.owner.is_color() {
                    let kind = if bible.unit_air[utyp] {
                        DescriptorKind::Air
                    } else {
                        DescriptorKind::Ground
                    };
                    board.place_unit(
                        Descriptor {
                            kind,
                            position: cell.pos,
                        },
                        UnitToken {
                            typ: utyp,
                            owner: spec.owner,
                            stacks: bible.unit_stacks_max[utyp].max(1) as i8,
                        },
                    );
                }
            }
        }

        let metadata = Metadata {
            players: colors.clone(),
            version: Version::current(),
            seed,
            map: map.name.clone(),
            bible: Some(bible.to_json()),
            challenge: None,
        };
        let mut ledgers = BTreeMap::new();
        for &player in &colors {
            ledgers.insert(
                player,
                Ledger {
                    money: bible.starting_money,
                    ..Ledger::default()
                },
            );
        }

        let mut automaton = Automaton {
            bible,
            board,
            players: colors,
            ledgers,
            phase: Phase::Resting,
            daytime: Daytime::Early,
            season: Season::Spring,
            round: 1,
            rng: MatchRng::new(seed),
            initiative: Vec::new(),
            queues: BTreeMap::new(),
            play_queue: VecDeque::new(),
            pending: VecDeque::new(),
            recording: Recording::new(metadata),
            replay: None,
            over: false,
        };

        let everyone = automaton.everyone();
        let mut set = ChangeSet::new();
        set.push(
            Change::Phase {
                phase: Phase::Resting,
            },
            everyone,
        );
        for player in automaton.players.clone() {
            let money = automaton.money(player);
            set.push(Change::Funds { player, money }, Vision::only(player));
        }
        automaton.refresh_vision(&mut set);
        automaton.pending.push_back(set);
        automaton
    }

    /// Start a match on a named map with the shipped ruleset.
    pub fn load(mapname: &str, players: Vec<Player>, seed: u64) -> Result<Automaton, LoadError> {
        let map = Map::load(mapname)?;
        Ok(Automaton::new(players, Bible::current(), &map, seed))
    }

    /// Reconstruct the match a recording came from and enter replay mode.
    pub fn from_recording(
        recording: &Recording,
        mode: ReplayMode,
    ) -> Result<Automaton, LoadError> {
        let bible = match &recording.metadata.bible {
            Some(doc) => Bible::from_json(doc)?,
            None => Bible::current(),
        };
        let mapname = if recording.metadata.map.is_empty() {
            "demo"
        } else {
            recording.metadata.map.as_str()
        };
        let map = Map::load(mapname)?;
        let mut automaton = Automaton::new(
            recording.metadata.players.clone(),
            bible,
            &map,
            recording.metadata.seed,
        );
        automaton.replay(recording, mode)?;
        Ok(automaton)
    }

    // --- public surface --------------------------------------------------

    /// Whether the match can progress without further player input.
    pub fn active(&self) -> bool {
        if self.replay.is_some() || !self.pending.is_empty() {
            return true;
        }
        if self.over {
            return false;
        }
        matches!(
            self.phase,
            Phase::Growth | Phase::Staging | Phase::Action | Phase::Decay
        )
    }

    /// Advance the match by one indivisible changeset.
    pub fn act(&mut self) -> ChangeSet {
        let set = if self.replay.is_some() {
            self.act_as_replay()
        } else {
            self.step_live()
        };
        // Replayed sets are recorded too, so a match resumed from a partial
        // log carries the whole history forward.
        if !set.is_empty() {
            self.recording.record(&set);
        }
        set
    }

    /// Submit or replace orders during the planning phase. At most
    /// `newOrderLimit` new orders per call; excess is dropped. An order
    /// replacing an existing order for the same subject silently discards
    /// the old one.
    pub fn receive(&mut self, player: Player, orders: Vec<Order>) {
        if self.over || self.phase != Phase::Planning {
            warn!(%player, phase = %self.phase, "orders outside the planning phase dropped");
            return;
        }
        let limit = self.bible.new_order_limit.max(0) as usize;
        let Some(ledger) = self.ledgers.get_mut(&player) else {
            warn!(%player, "orders from a non-participant dropped");
            return;
        };
        if ledger.resigned || ledger.defeated {
            warn!(%player, "orders from a departed player dropped");
            return;
        }
        let mut set = ChangeSet::new();
        for (ix, order) in orders.into_iter().enumerate() {
            if ix >= limit {
                warn!(%player, limit, "order beyond the per-call limit dropped");
                continue;
            }
            let subject = order.subject();
            ledger.orders.retain(|o| o.subject() != subject);
            ledger.orders.push(order.clone());
            set.push(Change::Ordered { player, order }, Vision::only(player));
        }
        if !set.is_empty() {
            self.pending.push_back(set);
        }
    }

    /// Resign from the match. The defeat itself is evaluated at the end of
    /// the current (or next) action phase.
    pub fn resign(&mut self, player: Player) {
        if self.over {
            return;
        }
        let everyone = self.everyone();
        let Some(ledger) = self.ledgers.get_mut(&player) else {
            warn!(%player, "resignation from a non-participant dropped");
            return;
        };
        if ledger.resigned || ledger.defeated {
            return;
        }
        ledger.resigned = true;
        let mut set = ChangeSet::new();
        set.push(Change::Resigned { player }, everyone);
        self.pending.push_back(set);
    }

    /// Catch-up state for a reconnecting client: phase clock, funds, and a
    /// full disclosure of every cell the player currently sees. Derived
    /// state only — nothing is enacted or recorded.
    pub fn rejoin(&self, player: Player) -> ChangeSet {
        let only = Vision::only(player);
        let mut set = ChangeSet::new();
        set.push(Change::Phase { phase: self.phase }, only);
        set.push(
            Change::Daytime {
                daytime: self.daytime,
            },
            only,
        );
        set.push(
            Change::Season {
                season: self.season,
            },
            only,
        );
        if player.is_color() {
            set.push(
                Change::Funds {
                    player,
                    money: self.money(player),
                },
                only,
            );
        }
        for cell in self.board.cells() {
            if self.board.vision_at(cell).contains(player) {
                self.reveal_to(player, cell, &mut set);
            }
        }
        set
    }

    /// Enter replay mode. Refuses recordings made by a newer engine, and —
    /// when replaying from orders — recordings whose baked ruleset differs
    /// from this automaton's.
    pub fn replay(&mut self, recording: &Recording, mode: ReplayMode) -> Result<(), LoadError> {
        let running = Version::current();
        if recording.metadata.version > running {
            return Err(LoadError::NewerVersion {
                recorded: recording.metadata.version,
                running,
            });
        }
        if mode == ReplayMode::FromOrders {
            if let Some(doc) = &recording.metadata.bible {
                let recorded = Bible::from_json(doc)?;
                if recorded != self.bible {
                    return Err(LoadError::RulesetMismatch);
                }
            }
        }
        self.replay = Some(Replay {
            mode,
            sets: recording.sets.iter().cloned().collect(),
        });
        if mode == ReplayMode::FromChanges {
            // The recorded log already carries the opening chunk; the one
            // this automaton computed for itself would be delivered twice.
            self.pending.clear();
        }
        Ok(())
    }

    // --- accessors -------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn daytime(&self) -> Daytime {
        self.daytime
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn bible(&self) -> &Bible {
        &self.bible
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn game_over(&self) -> bool {
        self.over
    }

    pub fn money(&self, player: Player) -> i32 {
        self.ledgers.get(&player).map(|l| l.money).unwrap_or(0)
    }

    pub fn defeated(&self, player: Player) -> bool {
        self.ledgers.get(&player).map(|l| l.defeated).unwrap_or(false)
    }

    // --- the stepper -----------------------------------------------------

    fn step_live(&mut self) -> ChangeSet {
        loop {
            if let Some(set) = self.pending.pop_front() {
                return set;
            }
            if self.over {
                return ChangeSet::new();
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        match self.phase {
            Phase::Growth => self.advance_growth(),
            Phase::Resting => self.open_planning(),
            Phase::Planning => self.close_planning(),
            Phase::Staging => self.begin_action(),
            Phase::Action => self.advance_action(),
            Phase::Decay => self.advance_decay(),
        }
    }

    fn everyone(&self) -> Vision {
        Vision::all(&self.players)
    }

    fn set_money(&mut self, player: Player, money: i32) {
        if let Some(ledger) = self.ledgers.get_mut(&player) {
            ledger.money = money;
        }
    }

    fn alive_players(&self) -> Vec<Player> {
        self.players
            .iter()
            .copied()
            .filter(|p| {
                self.ledgers
                    .get(p)
                    .map(|l| !l.defeated && !l.resigned)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Enact a change on the board and push it with its vision. The vision
    /// must have been computed before this call.
    fn emit(&mut self, set: &mut ChangeSet, change: Change, vision: Vision) {
        self.board.enact(&change);
        set.push(change, vision);
    }

    fn vision_of(&self, pos: Position) -> Vision {
        self.board
            .cell(pos)
            .map(|c| self.board.vision_at(c))
            .unwrap_or_default()
    }

    // --- growth ----------------------------------------------------------

    /// Advance the clock and run the environmental passes in their fixed
    /// order: power growth, then taxation, then pollution and weather, then
    /// markers, then plant growth, with the money cap last.
    fn advance_growth(&mut self) {
        self.round += 1;
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        self.emit(
            &mut set,
            Change::Phase {
                phase: Phase::Growth,
            },
            everyone,
        );

        let was = self.daytime;
        self.daytime = match was {
            Daytime::Early => Daytime::Late,
            Daytime::Late => Daytime::Early,
        };
        self.emit(
            &mut set,
            Change::Daytime {
                daytime: self.daytime,
            },
            everyone,
        );
        if was == Daytime::Early {
            self.season = self.season.next();
            self.emit(
                &mut set,
                Change::Season {
                    season: self.season,
                },
                everyone,
            );
        }

        PowerGrowth::new(&mut self.board, &self.bible, &mut set).execute();
        self.taxation(&mut set);
        self.auto_cultivate(&mut set);
        if !self.bible.ground_pollution_only_in_autumn || self.season == Season::Autumn {
            ChaosEmission::new(&mut self.board, &self.bible, &mut set).execute();
        }
        if self.daytime == Daytime::Early || !self.bible.weather_after_night {
            Weather::new(&mut self.board, &self.bible, self.season, &mut set).execute();
        }
        if self.daytime == Daytime::Late || !self.bible.markers_change_at_night {
            MarkerDerivation::new(&mut self.board, &self.bible, &mut self.rng, &mut set)
                .execute();
        }
        Transform::new(
            &mut self.board,
            &self.bible,
            self.season,
            &mut self.rng,
            &mut set,
        )
        .execute();
        self.cap_money(&mut set);
        self.refresh_vision(&mut set);
        self.pending.push_back(set);

        let mut rest = ChangeSet::new();
        rest.push(
            Change::Phase {
                phase: Phase::Resting,
            },
            everyone,
        );
        for player in self.players.clone() {
            let orders: Vec<Order> = self
                .ledgers
                .get(&player)
                .map(|l| l.orders.clone())
                .unwrap_or_default();
            for order in orders {
                rest.push(
                    Change::Unfinished {
                        subject: order.subject(),
                        order,
                    },
                    Vision::only(player),
                );
            }
        }
        self.pending.push_back(rest);
        self.phase = Phase::Resting;
    }

    fn taxation(&mut self, set: &mut ChangeSet) {
        for player in self.players.clone() {
            if self.defeated(player) {
                continue;
            }
            let mut income = 0;
            for cell in self.board.cells() {
                let tile = self.board.tile(cell);
                if tile.owner != player {
                    continue;
                }
                if self.bible.tile_laboring[tile.typ] {
                    income += self.bible.tile_income[tile.typ] * tile.stacks.max(0) as i32;
                }
                if self.bible.tile_energizing[tile.typ] {
                    income += self.bible.tile_income[tile.typ] * tile.power.max(0) as i32;
                }
            }
            if income == 0 {
                continue;
            }
            let money = self.money(player) + income;
            self.set_money(player, money);
            set.push(
                Change::Income {
                    player,
                    amount: income,
                },
                Vision::only(player),
            );
            set.push(Change::Funds { player, money }, Vision::only(player));
        }
    }

    /// Auto-cultivating tiles sow the first entry of their cultivation list
    /// onto every buildable neighbor, free of charge.
    fn auto_cultivate(&mut self, set: &mut ChangeSet) {
        let mut sowings: Vec<(Position, TileToken)> = Vec::new();
        for cell in self.board.cells() {
            let tile = self.board.tile(cell);
            if !self.bible.tile_autocultivates[tile.typ] || !tile.owner.is_color() {
                continue;
            }
            let Some(build) = self.bible.tile_cultivates[tile.typ].first() else {
                continue;
            };
            let token = TileToken {
                typ: build.tile,
                owner: tile.owner,
                stacks: self.bible.tile_stacks_built[build.tile].max(1) as i8,
                power: 0,
            };
            for near in self.board.area(cell, 1, 2) {
                if self.bible.tile_buildable[self.board.tile(near).typ]
                    && self.board.tile(near) != token
                {
                    sowings.push((near.pos, token));
                }
            }
        }
        for (pos, token) in sowings {
            let Some(cell) = self.board.cell(pos) else {
                continue;
            };
            // An earlier sowing this pass may have already taken the cell.
            if !self.bible.tile_buildable[self.board.tile(cell).typ]
                || self.board.tile(cell) == token
            {
                continue;
            }
            let vision = self.board.vision_at(cell);
            self.emit(
                set,
                Change::Cultivated {
                    subject: Descriptor::tile(pos),
                    tile: token,
                },
                vision,
            );
        }
    }

    fn cap_money(&mut self, set: &mut ChangeSet) {
        let floor = self.bible.min_money;
        let ceiling = self.bible.max_money.max(floor);
        for player in self.players.clone() {
            let money = self.money(player);
            let capped = money.clamp(floor, ceiling);
            if capped != money {
                self.set_money(player, capped);
                set.push(
                    Change::Funds {
                        player,
                        money: capped,
                    },
                    Vision::only(player),
                );
            }
        }
    }

    // --- planning and staging --------------------------------------------

    fn open_planning(&mut self) {
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        set.push(
            Change::Phase {
                phase: Phase::Planning,
            },
            everyone,
        );
        self.pending.push_back(set);
        self.phase = Phase::Planning;
    }

    fn close_planning(&mut self) {
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        set.push(
            Change::Phase {
                phase: Phase::Staging,
            },
            everyone,
        );
        let mut order = self.alive_players();
        self.rng.shuffle(&mut order);
        for (ix, &player) in order.iter().enumerate() {
            let vision = if self.bible.public_initiative {
                everyone
            } else {
                Vision::only(player)
            };
            set.push(
                Change::Initiative {
                    player,
                    position: ix as i8,
                },
                vision,
            );
        }
        self.initiative = order;
        self.pending.push_back(set);
        self.phase = Phase::Staging;
    }

    fn begin_action(&mut self) {
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        set.push(
            Change::Phase {
                phase: Phase::Action,
            },
            everyone,
        );
        self.pending.push_back(set);
        self.queues.clear();
        self.play_queue.clear();
        for player in self.initiative.clone() {
            let orders = self
                .ledgers
                .get_mut(&player)
                .map(|l| std::mem::take(&mut l.orders))
                .unwrap_or_default();
            if !orders.is_empty() {
                self.queues.insert(player, VecDeque::from(orders));
                self.play_queue.push_back(player);
            }
        }
        self.phase = Phase::Action;
    }

    // --- action ----------------------------------------------------------

    /// Execute one order of the next active player, round-robin in
    /// initiative order. When every queue is drained, evaluate defeats and
    /// fall through to decay.
    fn advance_action(&mut self) {
        while let Some(player) = self.play_queue.pop_front() {
            let departed = self
                .ledgers
                .get(&player)
                .map(|l| l.resigned || l.defeated)
                .unwrap_or(true);
            if departed {
                self.queues.remove(&player);
                continue;
            }
            let Some(queue) = self.queues.get_mut(&player) else {
                continue;
            };
            let Some(order) = queue.pop_front() else {
                continue;
            };
            if !queue.is_empty() {
                self.play_queue.push_back(player);
            }
            let set = self.play(player, order);
            if !set.is_empty() {
                self.pending.push_back(set);
            }
            return;
        }
        self.check_defeats();
        if !self.over {
            self.phase = Phase::Decay;
        }
    }

    fn play(&mut self, player: Player, order: Order) -> ChangeSet {
        let mut set = ChangeSet::new();
        let (disposition, notice) = match order.clone() {
            Order::Move { subject, moves } => self.play_move(player, subject, moves, &mut set),
            Order::Guard { subject, target } => {
                self.play_watch(player, subject, target, false, &mut set)
            }
            Order::Focus { subject, target } => {
                self.play_watch(player, subject, target, true, &mut set)
            }
            Order::Lockdown { subject, target } => {
                self.play_lockdown(player, subject, target, &mut set)
            }
            Order::Shell { subject, target } => self.play_shell(player, subject, target, &mut set),
            Order::Bombard { subject, target } => {
                self.play_bombard(player, subject, target, &mut set)
            }
            Order::Bomb { subject } => self.play_bomb(player, subject, &mut set),
            Order::Capture { subject } => self.play_capture(player, subject, &mut set),
            Order::Shape { subject, tile } => self.play_shape(player, subject, tile, &mut set),
            Order::Settle { subject, tile } => self.play_settle(player, subject, tile, &mut set),
            Order::Expand {
                subject,
                target,
                tile,
            } => self.play_expand(player, subject, target, tile, &mut set),
            Order::Upgrade { subject, tile } => self.play_upgrade(player, subject, tile, &mut set),
            Order::Cultivate { subject, tile } => {
                self.play_cultivate(player, subject, tile, &mut set)
            }
            Order::Produce {
                subject,
                target,
                unit,
            } => self.play_produce(player, subject, target, unit, &mut set),
            Order::Halt { .. } => (Disposition::Finished, Notice::Halted),
        };
        match disposition {
            Disposition::Finished => {
                if notice != Notice::None {
                    set.push(
                        Change::Discarded {
                            subject: order.subject(),
                            notice,
                        },
                        Vision::only(player),
                    );
                }
            }
            Disposition::Discarded => {
                set.push(
                    Change::Discarded {
                        subject: order.subject(),
                        notice,
                    },
                    Vision::only(player),
                );
            }
            Disposition::Postponed => {
                set.push(
                    Change::Postponed {
                        subject: order.subject(),
                        notice,
                    },
                    Vision::only(player),
                );
                self.retain(player, order);
            }
            Disposition::Unfinished(rest) => {
                set.push(
                    Change::Unfinished {
                        subject: rest.subject(),
                        order: rest.clone(),
                    },
                    Vision::only(player),
                );
                self.retain(player, rest);
            }
        }
        self.refresh_vision(&mut set);
        set
    }

    fn retain(&mut self, player: Player, order: Order) {
        if let Some(ledger) = self.ledgers.get_mut(&player) {
            ledger.orders.push(order);
        }
    }

    // --- order validation helpers ----------------------------------------

    fn unit_subject(&self, player: Player, subject: Descriptor) -> Result<UnitToken, Notice> {
        if !subject.is_unit() {
            return Err(Notice::NoSuitableSubject);
        }
        let unit = self.board.unit(subject);
        if unit.is_none() {
            return Err(Notice::SubjectKilled);
        }
        if unit.owner != player {
            return Err(Notice::NoSuitableSubject);
        }
        Ok(unit)
    }

    fn tile_subject(&self, player: Player, subject: Descriptor) -> Result<TileToken, Notice> {
        if subject.kind != DescriptorKind::Tile {
            return Err(Notice::NoSuitableSubject);
        }
        let Some(cell) = self.board.cell(subject.position) else {
            return Err(Notice::NoSuitableSubject);
        };
        let tile = self.board.tile(cell);
        if tile.is_none() {
            return Err(Notice::SubjectKilled);
        }
        if tile.owner != player {
            return Err(Notice::NoSuitableSubject);
        }
        Ok(tile)
    }

    /// Frostbitten cells give units cold feet in spring: no attacks or
    /// abilities until the unit moves off the cell.
    fn cold_feet(&self, subject: Descriptor) -> bool {
        self.bible.cold_feet_in_spring
            && self.season == Season::Spring
            && self
                .board
                .cell(subject.position)
                .map(|c| self.board.frostbite(c))
                .unwrap_or(false)
    }

    fn background_at(&self, target: Descriptor) -> Background {
        let trenched = target.kind == DescriptorKind::Ground
            && self
                .board
                .cell(target.position)
                .map(|c| self.bible.tile_trenches[self.board.tile(c).typ])
                .unwrap_or(false);
        if trenched {
            Background {
                miss_count: self.bible.miss_count_trenches,
                miss_hitpoints: self.bible.miss_hitpoints_trenches,
            }
        } else {
            Background {
                miss_count: self.bible.miss_count_ground,
                miss_hitpoints: self.bible.miss_hitpoints_ground,
            }
        }
    }

    fn unit_taker(&self, desc: Descriptor) -> Taker {
        let unit = self.board.unit(desc);
        Taker {
            subject: desc,
            stacks: unit.stacks.max(0) as i32,
            hitpoints: self.bible.unit_hitpoints[unit.typ].max(1),
            power: 0,
        }
    }

    fn tile_taker(&self, cell: Cell) -> Taker {
        let tile = self.board.tile(cell);
        Taker {
            subject: Descriptor::tile(cell.pos),
            stacks: tile.stacks.max(0) as i32,
            hitpoints: self.bible.tile_hitpoints[tile.typ].max(1),
            power: tile.power.max(0) as i32,
        }
    }

    /// The takers an attack on `cell` rolls against: the enemy ground
    /// unit, any bypassing body not hidden by trenches, and — when asked —
    /// the enemy or neutral destructible tile.
    fn cell_takers(&self, cell: Cell, attacker: Player, include_tile: bool) -> Vec<Taker> {
        let mut takers = Vec::new();
        let ground = self.board.ground(cell);
        if ground.is_some() && ground.owner != attacker {
            takers.push(self.unit_taker(Descriptor::ground(cell.pos)));
        }
        let bypass = self.board.bypass(cell);
        let hidden = self.bible.tile_trenches[self.board.tile(cell).typ]
            && self.bible.trenches_hide_bypassed_unit;
        if bypass.is_some() && bypass.owner != attacker && !hidden {
            takers.push(self.unit_taker(Descriptor::bypass(cell.pos)));
        }
        let tile = self.board.tile(cell);
        if include_tile
            && tile.is_some()
            && self.bible.tile_destructible[tile.typ]
            && tile.owner != attacker
            && tile.stacks > 0
        {
            takers.push(self.tile_taker(cell));
        }
        takers
    }

    fn apply_hits(&mut self, set: &mut ChangeSet, hits: &[Hit], kind: HitKind) {
        for hit in hits {
            if hit.missed {
                continue;
            }
            let vision = self.vision_of(hit.subject.position);
            self.emit(set, hit_change(kind, hit), vision);
        }
    }

    /// Emit a death for a unit whose stacks have run out.
    fn bury_unit(&mut self, subject: Descriptor, set: &mut ChangeSet) {
        let unit = self.board.unit(subject);
        if unit.is_some() && unit.stacks <= 0 {
            let vision = self.vision_of(subject.position);
            self.emit(set, Change::Died { subject }, vision);
        }
    }

    /// Replace a tile whose stacks have run out with its wreck. Firestorm
    /// consumption uses the consumed-into table instead of destroyed-into.
    fn bury_tile(&mut self, cell: Cell, consumed: bool, set: &mut ChangeSet) {
        let tile = self.board.tile(cell);
        if tile.is_none() || tile.stacks > 0 {
            return;
        }
        let target = if consumed {
            self.bible.tile_consumed_into[tile.typ]
        } else {
            self.bible.tile_destroyed_into[tile.typ]
        };
        let token = if target.is_some() {
            TileToken {
                typ: target,
                owner: Player::None,
                stacks: self.bible.tile_stacks_built[target].max(1) as i8,
                power: 0,
            }
        } else {
            TileToken::default()
        };
        let subject = Descriptor::tile(cell.pos);
        let vision = self.vision_of(cell.pos);
        let change = if consumed {
            Change::Consumed {
                subject,
                tile: token,
            }
        } else {
            Change::Destroyed {
                subject,
                tile: token,
            }
        };
        self.emit(set, change, vision);
    }

    /// Standing lockdown orders of other players that pin this cell.
    fn lockdown_threats(&self, pos: Position, victim: Player) -> Vec<Descriptor> {
        let mut threats = Vec::new();
        for (&player, ledger) in &self.ledgers {
            if player == victim || ledger.defeated || ledger.resigned {
                continue;
            }
            for order in &ledger.orders {
                if let Order::Lockdown { subject, target } = order {
                    if *target != pos {
                        continue;
                    }
                    let unit = self.board.unit(*subject);
                    if unit.is_some()
                        && unit.owner == player
                        && self.bible.unit_can_lockdown[unit.typ]
                    {
                        threats.push(*subject);
                    }
                }
            }
        }
        threats
    }

    fn opportunity_attack(&mut self, locker: Descriptor, victim: Descriptor, set: &mut ChangeSet) {
        let attacker = self.board.unit(locker);
        let target = self.board.unit(victim);
        if attacker.is_none() || target.is_none() {
            return;
        }
        let vision = self
            .vision_of(locker.position)
            .union(self.vision_of(victim.position));
        set.push(
            Change::Attacks {
                subject: locker,
                target: victim,
            },
            vision,
        );
        let attackers = [Attacker {
            subject: locker,
            token: attacker,
            shots: self.bible.unit_attack_shots[attacker.typ] * attacker.stacks.max(0) as i32,
            damage: self.bible.unit_attack_damage[attacker.typ],
        }];
        let takers = [self.unit_taker(victim)];
        let background = self.background_at(victim);
        let hits = damage::resolve(&attackers, &takers, background, &mut self.rng);
        self.apply_hits(set, &hits, HitKind::Attacked);
        self.bury_unit(victim, set);
    }

    // --- order execution -------------------------------------------------

    fn play_move(
        &mut self,
        player: Player,
        subject: Descriptor,
        moves: MoveList,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_move[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if moves.is_empty() {
            return (Disposition::Discarded, Notice::InvalidTarget);
        }

        let air = self.bible.unit_air[unit.typ];
        let subject_id = self.board.unit_id(subject);
        let mut cur = subject;
        let mut remaining = moves;
        let mut budget = self.bible.unit_speed[unit.typ].max(1);
        let mut slow_used = 0;
        let mut steps = 0;
        let mut block = Notice::None;

        set.push(Change::Starts { subject: cur }, self.vision_of(cur.position));

        while let Some(&next) = remaining.first() {
            if budget <= 0 {
                break;
            }
            if !cur.position.is_adjacent(next) {
                block = Notice::InvalidTarget;
                break;
            }
            let Some(to_cell) = self.board.cell(next) else {
                block = Notice::InvalidTarget;
                break;
            };
            let to_tile = self.board.tile(to_cell);
            let passable = if air {
                self.bible.tile_accessible[to_tile.typ]
            } else {
                self.bible.tile_walkable[to_tile.typ]
            };
            if !passable {
                block = Notice::InvalidTarget;
                break;
            }

            // Attack of opportunity: stepping out of a pinned cell draws
            // fire and halts the move. Bypassing bodies are exempt.
            let exempt =
                cur.kind == DescriptorKind::Bypass && self.bible.bypass_exempt_from_lockdown;
            if !air && !exempt {
                let threats = self.lockdown_threats(cur.position, player);
                if !threats.is_empty() {
                    for locker in threats {
                        self.opportunity_attack(locker, cur, set);
                        if self.board.unit(cur).is_none() {
                            return (Disposition::Discarded, Notice::SubjectKilled);
                        }
                        // A live token under the subject's descriptor with a
                        // different id: the slot was refilled mid-move.
                        if self.board.unit_id(cur) != subject_id {
                            return (Disposition::Discarded, Notice::SubjectReplaced);
                        }
                    }
                    block = Notice::Lockdown;
                    break;
                }
            }

            let slot = if air {
                DescriptorKind::Air
            } else {
                DescriptorKind::Ground
            };
            let occupant = self.board.unit(Descriptor {
                kind: slot,
                position: next,
            });
            let dest = if occupant.is_none() {
                Descriptor {
                    kind: slot,
                    position: next,
                }
            } else if occupant.owner != player {
                block = Notice::OccupiedByEnemy;
                break;
            } else {
                // A friendly body: pass through the bypass slot when the
                // move continues into a free cell beyond it.
                let exit_free = remaining.get(1).copied().is_some_and(|exit| {
                    next.is_adjacent(exit)
                        && self.board.cell(exit).is_some_and(|ec| {
                            self.bible.tile_walkable[self.board.tile(ec).typ]
                                && self.board.ground(ec).is_none()
                        })
                });
                if !air && exit_free && budget >= 2 && self.board.bypass(to_cell).is_none() {
                    Descriptor::bypass(next)
                } else {
                    block = Notice::OccupiedByAlly;
                    break;
                }
            };

            let vision = self.vision_of(cur.position).union(self.vision_of(next));
            self.emit(
                set,
                Change::Moves {
                    subject: cur,
                    target: dest,
                },
                vision,
            );
            budget -= 1;
            if !air && self.board.snow(to_cell) && slow_used < self.bible.snow_slow_maximum {
                let slow = self
                    .bible
                    .snow_slow_amount
                    .min(self.bible.snow_slow_maximum - slow_used);
                budget -= slow;
                slow_used += slow;
            }
            steps += 1;
            cur = dest;
            remaining.remove(0);

            if !air && self.bible.unit_trample_shots[unit.typ] > 0 {
                self.trample(cur, unit, to_cell, set);
            }
            if !air
                && self.bible.trenches_force_occupy
                && self.bible.unit_can_occupy[unit.typ]
                && self.bible.tile_trenches[self.board.tile(to_cell).typ]
            {
                budget = 0;
            }
        }

        if remaining.is_empty() {
            return (Disposition::Finished, Notice::None);
        }
        if steps > 0 {
            let rest = Order::Move {
                subject: cur,
                moves: remaining,
            };
            return (Disposition::Unfinished(rest), Notice::None);
        }
        match block {
            Notice::InvalidTarget => (Disposition::Discarded, Notice::InvalidTarget),
            notice => (Disposition::Postponed, notice),
        }
    }

    fn trample(
        &mut self,
        mover: Descriptor,
        unit: UnitToken,
        cell: Cell,
        set: &mut ChangeSet,
    ) {
        let tile = self.board.tile(cell);
        if tile.is_none()
            || !self.bible.tile_destructible[tile.typ]
            || tile.owner == unit.owner
            || tile.stacks <= 0
        {
            return;
        }
        let target = Descriptor::tile(cell.pos);
        set.push(
            Change::Tramples {
                subject: mover,
                target,
            },
            self.vision_of(cell.pos),
        );
        let attackers = [Attacker {
            subject: mover,
            token: unit,
            shots: self.bible.unit_trample_shots[unit.typ] * unit.stacks.max(0) as i32,
            damage: self.bible.unit_trample_damage[unit.typ],
        }];
        let takers = [self.tile_taker(cell)];
        let hits = damage::resolve(&attackers, &takers, Background::default(), &mut self.rng);
        self.apply_hits(set, &hits, HitKind::Trampled);
        self.bury_tile(cell, false, set);
    }

    /// Guard and focus: standing attack orders on an adjacent cell. Guard
    /// strikes units only; focus also brings the tile down.
    fn play_watch(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        focus: bool,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        let capable = if focus {
            self.bible.unit_can_focus[unit.typ]
        } else {
            self.bible.unit_can_attack[unit.typ]
        };
        if !capable {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        let distance = subject.position.squared_distance(target);
        if !(1..=2).contains(&distance) {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let Some(cell) = self.board.cell(target) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };

        let takers = self.cell_takers(cell, player, focus);
        if takers.is_empty() {
            // Nothing to strike yet; the watch stands.
            return (Disposition::Postponed, Notice::None);
        }
        let primary = takers[0].subject;
        set.push(
            Change::Attacks {
                subject,
                target: primary,
            },
            self.vision_of(subject.position).union(self.vision_of(target)),
        );
        let attackers = [Attacker {
            subject,
            token: unit,
            shots: self.bible.unit_attack_shots[unit.typ] * unit.stacks.max(0) as i32,
            damage: self.bible.unit_attack_damage[unit.typ],
        }];
        let background = self.background_at(primary);
        let hits = damage::resolve(&attackers, &takers, background, &mut self.rng);
        self.apply_hits(set, &hits, HitKind::Attacked);
        for taker in &takers {
            if taker.subject.is_unit() {
                self.bury_unit(taker.subject, set);
            }
        }
        self.bury_tile(cell, false, set);
        if primary.is_unit() && self.board.unit(primary).is_some() {
            set.push(
                Change::Survived { subject: primary },
                self.vision_of(primary.position),
            );
        }
        (Disposition::Postponed, Notice::None)
    }

    fn play_lockdown(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_lockdown[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        let distance = subject.position.squared_distance(target);
        if !(1..=2).contains(&distance) {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        if self.board.cell(target).is_none() {
            return (Disposition::Discarded, Notice::InvalidTarget);
        }
        set.push(
            Change::Aims {
                subject,
                target: Descriptor::cell(target),
            },
            self.vision_of(subject.position).union(self.vision_of(target)),
        );
        (Disposition::Postponed, Notice::None)
    }

    fn play_shell(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_shell[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let distance = subject.position.squared_distance(target);
        if distance < self.bible.unit_range_min[unit.typ]
            || distance > self.bible.unit_range_max[unit.typ]
        {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        let Some(cell) = self.board.cell(target) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        set.push(
            Change::Shells {
                subject,
                target: Descriptor::cell(target),
            },
            self.vision_of(subject.position).union(self.vision_of(target)),
        );
        self.volley(subject, unit, cell, HitKind::Shelled, set);
        (Disposition::Finished, Notice::None)
    }

    fn play_bombard(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_bombard[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let distance = subject.position.squared_distance(target);
        if distance < self.bible.unit_range_min[unit.typ]
            || distance > self.bible.unit_range_max[unit.typ]
        {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        let Some(cell) = self.board.cell(target) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        for _ in 0..self.bible.unit_ability_volleys[unit.typ].max(1) {
            set.push(
                Change::Bombards {
                    subject,
                    target: Descriptor::cell(target),
                },
                self.vision_of(subject.position).union(self.vision_of(target)),
            );
            self.volley(subject, unit, cell, HitKind::Bombarded, set);
        }
        (Disposition::Finished, Notice::None)
    }

    /// One ability volley against a cell: shots roll over whatever stands
    /// there, the wrecks are buried afterwards.
    fn volley(
        &mut self,
        subject: Descriptor,
        unit: UnitToken,
        cell: Cell,
        kind: HitKind,
        set: &mut ChangeSet,
    ) {
        let takers = self.cell_takers(cell, unit.owner, true);
        if takers.is_empty() {
            return;
        }
        let attackers = [Attacker {
            subject,
            token: unit,
            shots: self.bible.unit_ability_shots[unit.typ] * unit.stacks.max(0) as i32,
            damage: self.bible.unit_ability_damage[unit.typ],
        }];
        let background = self.background_at(takers[0].subject);
        let hits = damage::resolve(&attackers, &takers, background, &mut self.rng);
        self.apply_hits(set, &hits, kind);
        for taker in &takers {
            if taker.subject.is_unit() {
                self.bury_unit(taker.subject, set);
            }
        }
        self.bury_tile(cell, false, set);
    }

    fn play_bomb(
        &mut self,
        player: Player,
        subject: Descriptor,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_bomb[unit.typ] || subject.kind != DescriptorKind::Air {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let Some(cell) = self.board.cell(subject.position) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        set.push(
            Change::Bombs {
                subject,
                target: Descriptor::cell(cell.pos),
            },
            self.vision_of(cell.pos),
        );
        if self.bible.unit_ability_shots[unit.typ] > 0 {
            self.volley(subject, unit, cell, HitKind::Bombed, set);
        }
        let gas = self.bible.unit_ability_gas[unit.typ];
        let rads = self.bible.unit_ability_rads[unit.typ];
        let radius = self.bible.unit_ability_radius[unit.typ].max(0);
        let blast: Vec<Cell> = self.board.area(cell, 0, radius).collect();
        for struck in blast {
            let pos = struck.pos;
            if gas > 0 {
                let value = (self.board.gas(struck) as i32 + gas).clamp(0, i8::MAX as i32) as i8;
                if value != self.board.gas(struck) {
                    let vision = self.board.vision_at(struck);
                    self.emit(
                        set,
                        Change::Gas {
                            subject: Descriptor::cell(pos),
                            value,
                        },
                        vision,
                    );
                }
            }
            if rads > 0 {
                let value =
                    (self.board.radiation(struck) as i32 + rads).clamp(0, i8::MAX as i32) as i8;
                if value != self.board.radiation(struck) {
                    let vision = self.board.vision_at(struck);
                    self.emit(
                        set,
                        Change::Radiation {
                            subject: Descriptor::cell(pos),
                            value,
                        },
                        vision,
                    );
                }
            }
        }
        (Disposition::Finished, Notice::None)
    }

    fn play_capture(
        &mut self,
        player: Player,
        subject: Descriptor,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_capture[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let Some(cell) = self.board.cell(subject.position) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let tile = self.board.tile(cell);
        if tile.is_none() || !self.bible.tile_ownable[tile.typ] || tile.owner == player {
            return (Disposition::Discarded, Notice::InvalidTarget);
        }
        if self.bible.capture_strength_check && (unit.stacks as i32) < tile.power as i32 {
            return (Disposition::Postponed, Notice::LackingStacks);
        }
        let target = Descriptor::tile(cell.pos);
        let vision = self.vision_of(cell.pos);
        set.push(Change::Captures { subject, target }, vision);
        self.emit(
            set,
            Change::Captured {
                subject: target,
                player,
            },
            vision,
        );
        (Disposition::Finished, Notice::None)
    }

    fn charge(&mut self, player: Player, amount: i32, set: &mut ChangeSet) {
        if amount == 0 {
            return;
        }
        let money = self.money(player) - amount;
        self.set_money(player, money);
        set.push(
            Change::Expenditure { player, amount },
            Vision::only(player),
        );
        set.push(Change::Funds { player, money }, Vision::only(player));
    }

    fn play_shape(
        &mut self,
        player: Player,
        subject: Descriptor,
        tile: TileType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_shape[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let Some(build) = self.bible.unit_shapes[unit.typ]
            .iter()
            .find(|b| b.tile == tile)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let Some(cell) = self.board.cell(subject.position) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        if !self.bible.tile_buildable[self.board.tile(cell).typ] {
            return (Disposition::Discarded, Notice::Unbuildable);
        }
        if self.money(player) < build.cost() {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        self.charge(player, build.cost(), set);
        let vision = self.vision_of(cell.pos);
        set.push(Change::Shapes { subject, tile }, vision);
        let token = TileToken {
            typ: tile,
            owner: player,
            stacks: self.bible.tile_stacks_built[tile].max(1) as i8,
            power: self.bible.tile_power_built[tile] as i8,
        };
        self.emit(
            set,
            Change::Shaped {
                subject: Descriptor::tile(cell.pos),
                tile: token,
            },
            vision,
        );
        (Disposition::Finished, Notice::None)
    }

    fn play_settle(
        &mut self,
        player: Player,
        subject: Descriptor,
        tile: TileType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let unit = match self.unit_subject(player, subject) {
            Ok(unit) => unit,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.unit_can_settle[unit.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.cold_feet(subject) {
            return (Disposition::Discarded, Notice::ColdFeet);
        }
        let Some(build) = self.bible.unit_settles[unit.typ]
            .iter()
            .find(|b| b.tile == tile)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let Some(cell) = self.board.cell(subject.position) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        if !self.bible.tile_buildable[self.board.tile(cell).typ] {
            return (Disposition::Discarded, Notice::Unbuildable);
        }
        if self.money(player) < build.cost() {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        self.charge(player, build.cost(), set);
        let vision = self.vision_of(cell.pos);
        set.push(Change::Settles { subject, tile }, vision);
        let token = TileToken {
            typ: tile,
            owner: player,
            stacks: self.bible.tile_stacks_built[tile].max(1) as i8,
            power: self.bible.tile_power_built[tile] as i8,
        };
        // The settling unit is consumed along with the terrain.
        self.emit(
            set,
            Change::Settled {
                subject,
                tile: token,
            },
            vision,
        );
        (Disposition::Finished, Notice::None)
    }

    fn play_expand(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        tile: TileType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let source = match self.tile_subject(player, subject) {
            Ok(tile) => tile,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.tile_controllable[source.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.bible.tile_powered[source.typ] && source.power <= 0 {
            return (Disposition::Postponed, Notice::LackingPower);
        }
        let Some(build) = self.bible.tile_expands[source.typ]
            .iter()
            .find(|b| b.tile == tile)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let distance = subject.position.squared_distance(target);
        if distance < self.bible.tile_expand_range_min[source.typ]
            || distance > self.bible.tile_expand_range_max[source.typ]
        {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        let Some(cell) = self.board.cell(target) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        if !self.bible.tile_buildable[self.board.tile(cell).typ] {
            return (Disposition::Discarded, Notice::Unbuildable);
        }
        let occupant = self.board.ground(cell);
        if occupant.is_some() && occupant.owner != player {
            return (Disposition::Postponed, Notice::OccupiedByEnemy);
        }
        if self.money(player) < build.cost() {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        self.charge(player, build.cost(), set);
        let vision = self.vision_of(subject.position).union(self.vision_of(target));
        set.push(
            Change::Expands {
                subject,
                target: Descriptor::cell(target),
                tile,
            },
            vision,
        );
        let token = TileToken {
            typ: tile,
            owner: player,
            stacks: self.bible.tile_stacks_built[tile].max(1) as i8,
            power: self.bible.tile_power_built[tile] as i8,
        };
        let target_vision = self.vision_of(target);
        self.emit(
            set,
            Change::Expanded {
                subject: Descriptor::tile(target),
                tile: token,
            },
            target_vision,
        );
        (Disposition::Finished, Notice::None)
    }

    fn play_upgrade(
        &mut self,
        player: Player,
        subject: Descriptor,
        tile: TileType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let source = match self.tile_subject(player, subject) {
            Ok(tile) => tile,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.tile_controllable[source.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.bible.tile_powered[source.typ] && source.power <= 0 {
            return (Disposition::Postponed, Notice::LackingPower);
        }
        let Some(build) = self.bible.tile_upgrades[source.typ]
            .iter()
            .find(|b| b.tile == tile)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        if self.money(player) < build.cost() {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        self.charge(player, build.cost(), set);
        let vision = self.vision_of(subject.position);
        set.push(Change::Upgrades { subject, tile }, vision);
        let token = TileToken {
            typ: tile,
            owner: player,
            stacks: source
                .stacks
                .min(self.bible.tile_stacks_max[tile].max(1) as i8)
                .max(1),
            power: self.bible.tile_power_built[tile] as i8,
        };
        self.emit(
            set,
            Change::Upgraded {
                subject,
                tile: token,
            },
            vision,
        );
        (Disposition::Finished, Notice::None)
    }

    fn play_cultivate(
        &mut self,
        player: Player,
        subject: Descriptor,
        tile: TileType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let source = match self.tile_subject(player, subject) {
            Ok(tile) => tile,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if self.bible.tile_powered[source.typ] && source.power <= 0 {
            return (Disposition::Postponed, Notice::LackingPower);
        }
        let Some(build) = self.bible.tile_cultivates[source.typ]
            .iter()
            .find(|b| b.tile == tile)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let Some(cell) = self.board.cell(subject.position) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let token = TileToken {
            typ: tile,
            owner: player,
            stacks: self.bible.tile_stacks_built[tile].max(1) as i8,
            power: 0,
        };
        let eligible: Vec<Position> = self
            .board
            .area(cell, 1, 2)
            .filter(|&near| {
                self.bible.tile_buildable[self.board.tile(near).typ]
                    && self.board.tile(near) != token
            })
            .map(|near| near.pos)
            .collect();
        if eligible.is_empty() {
            return (Disposition::Discarded, Notice::Unbuildable);
        }
        let cost = build.cost();
        let affordable = if cost > 0 {
            (self.money(player) / cost).max(0) as usize
        } else {
            eligible.len()
        };
        if affordable == 0 {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        let sown = eligible.len().min(affordable);
        self.charge(player, cost * sown as i32, set);
        set.push(
            Change::Cultivates { subject, tile },
            self.vision_of(subject.position),
        );
        for pos in eligible.into_iter().take(sown) {
            let vision = self.vision_of(pos);
            self.emit(
                set,
                Change::Cultivated {
                    subject: Descriptor::tile(pos),
                    tile: token,
                },
                vision,
            );
        }
        (Disposition::Finished, Notice::None)
    }

    fn play_produce(
        &mut self,
        player: Player,
        subject: Descriptor,
        target: Position,
        unit: UnitType,
        set: &mut ChangeSet,
    ) -> (Disposition, Notice) {
        let source = match self.tile_subject(player, subject) {
            Ok(tile) => tile,
            Err(notice) => return (Disposition::Discarded, notice),
        };
        if !self.bible.tile_controllable[source.typ] {
            return (Disposition::Discarded, Notice::NoSuitableSubject);
        }
        if self.bible.tile_powered[source.typ] && source.power <= 0 {
            return (Disposition::Postponed, Notice::LackingPower);
        }
        let Some(build) = self.bible.tile_produces[source.typ]
            .iter()
            .find(|b| b.unit == unit)
            .copied()
        else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        let distance = subject.position.squared_distance(target);
        if distance < self.bible.tile_produce_range_min[source.typ]
            || distance > self.bible.tile_produce_range_max[source.typ]
        {
            return (Disposition::Discarded, Notice::OutOfRange);
        }
        let Some(cell) = self.board.cell(target) else {
            return (Disposition::Discarded, Notice::InvalidTarget);
        };
        if !self.bible.tile_accessible[self.board.tile(cell).typ] {
            return (Disposition::Discarded, Notice::Unbuildable);
        }
        let kind = if self.bible.unit_air[unit] {
            DescriptorKind::Air
        } else {
            DescriptorKind::Ground
        };
        let dest = Descriptor {
            kind,
            position: target,
        };
        if self.board.unit(dest).is_some() {
            return (Disposition::Postponed, Notice::DestinationOccupied);
        }
        if self.money(player) < build.cost() {
            return (Disposition::Postponed, Notice::LackingMoney);
        }
        self.charge(player, build.cost(), set);
        set.push(
            Change::Produces { subject, unit },
            self.vision_of(subject.position),
        );
        let token = UnitToken {
            typ: unit,
            owner: player,
            stacks: self.bible.unit_stacks_max[unit].max(1) as i8,
        };
        let vision = self.vision_of(subject.position).union(self.vision_of(target));
        self.emit(
            set,
            Change::Produced {
                subject: dest,
                unit: token,
            },
            vision,
        );
        (Disposition::Finished, Notice::None)
    }

    // --- defeat and victory ----------------------------------------------

    fn score(&self, player: Player) -> i32 {
        self.board
            .cells()
            .map(|c| {
                let tile = self.board.tile(c);
                if tile.owner == player {
                    self.bible.tile_score[tile.typ]
                } else {
                    0
                }
            })
            .sum()
    }

    fn has_binding_tile(&self, player: Player) -> bool {
        self.board.cells().any(|c| {
            let tile = self.board.tile(c);
            tile.owner == player && self.bible.tile_binding[tile.typ]
        })
    }

    fn check_defeats(&mut self) {
        for player in self.players.clone() {
            let Some(ledger) = self.ledgers.get(&player) else {
                continue;
            };
            if ledger.defeated {
                continue;
            }
            if ledger.resigned || !self.has_binding_tile(player) {
                self.defeat(player);
            }
        }
        if self.alive_players().len() <= 1 {
            self.finish_game();
        }
    }

    /// One homogeneous changeset: the defeat announcement, every owned
    /// tile released to nobody, then the whole map revealed to the
    /// defeated player.
    fn defeat(&mut self, player: Player) {
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        let score = self.score(player);
        set.push(Change::Defeat { player, score }, everyone);
        let owned: Vec<Position> = self
            .board
            .cells()
            .filter(|&c| self.board.tile(c).owner == player)
            .map(|c| c.pos)
            .collect();
        for pos in owned {
            let vision = self.vision_of(pos);
            self.emit(
                &mut set,
                Change::Captured {
                    subject: Descriptor::tile(pos),
                    player: Player::None,
                },
                vision,
            );
        }
        if let Some(ledger) = self.ledgers.get_mut(&player) {
            ledger.defeated = true;
        }
        self.refresh_vision(&mut set);
        self.pending.push_back(set);
    }

    fn finish_game(&mut self) {
        let everyone = self.everyone();
        let mut set = ChangeSet::new();
        let mut total = 0;
        for player in self.players.clone() {
            let score = self.score(player);
            total += score;
            set.push(Change::Scored { player, score }, everyone);
        }
        set.push(Change::GameOver { score: total }, everyone);
        self.pending.push_back(set);
        self.over = true;
    }

    // --- decay -----------------------------------------------------------

    /// Apply the accumulated hazards cell by cell in one seeded random
    /// order, each cell a self-contained changeset, then leak pollution
    /// and run the gas and radiation diffusion passes once.
    fn advance_decay(&mut self) {
        let everyone = self.everyone();
        let mut opening = ChangeSet::new();
        opening.push(
            Change::Phase {
                phase: Phase::Decay,
            },
            everyone,
        );
        self.pending.push_back(opening);

        let mut bag = Randomizer::new();
        for cell in self.board.cells() {
            let hazardous = self.board.death(cell)
                || self.board.frostbite(cell)
                || self.board.firestorm(cell)
                || self.board.gas(cell) > 0
                || self.board.radiation(cell) > 0;
            if hazardous {
                bag.push(cell.ix, 1);
            }
        }
        let mut order = Vec::new();
        while let Some(ix) = bag.draw(&mut self.rng) {
            order.push(ix);
        }
        for ix in order {
            let set = self.decay_cell(ix);
            if !set.is_empty() {
                self.pending.push_back(set);
            }
        }

        let mut leaks = ChangeSet::new();
        self.leak(&mut leaks);
        if !leaks.is_empty() {
            self.pending.push_back(leaks);
        }
        let mut gas = ChangeSet::new();
        GasDiffusion::new(&mut self.board, &mut gas).execute();
        if !gas.is_empty() {
            self.pending.push_back(gas);
        }
        let mut rads = ChangeSet::new();
        RadiationDiffusion::new(&mut self.board, &mut rads).execute();
        if !rads.is_empty() {
            self.pending.push_back(rads);
        }

        self.check_defeats();
        if !self.over {
            self.phase = Phase::Growth;
        }
    }

    fn decay_cell(&mut self, ix: usize) -> ChangeSet {
        let mut set = ChangeSet::new();
        let cell = self.board.cell_at(ix);
        if self.board.death(cell) {
            self.decay_death(cell, &mut set);
        }
        if self.board.frostbite(cell) {
            self.decay_frostbite(cell, &mut set);
        }
        if self.board.firestorm(cell) {
            self.decay_firestorm(cell, &mut set);
        }
        if self.board.gas(cell) > 0 {
            self.decay_gas(cell, &mut set);
        }
        if self.board.radiation(cell) > 0 {
            self.decay_radiation(cell, &mut set);
        }
        if !set.is_empty() {
            self.refresh_vision(&mut set);
        }
        set
    }

    /// The death marker is absolute: everything on the cell dies.
    fn decay_death(&mut self, cell: Cell, set: &mut ChangeSet) {
        for kind in [
            DescriptorKind::Ground,
            DescriptorKind::Air,
            DescriptorKind::Bypass,
        ] {
            let desc = Descriptor {
                kind,
                position: cell.pos,
            };
            if self.board.unit(desc).is_some() {
                let vision = self.vision_of(cell.pos);
                self.emit(set, Change::Died { subject: desc }, vision);
            }
        }
        let tile = self.board.tile(cell);
        if tile.is_some() && self.bible.tile_destructible[tile.typ] {
            let target = self.bible.tile_destroyed_into[tile.typ];
            let token = if target.is_some() {
                TileToken {
                    typ: target,
                    owner: Player::None,
                    stacks: self.bible.tile_stacks_built[target].max(1) as i8,
                    power: 0,
                }
            } else {
                TileToken::default()
            };
            if token != tile {
                let vision = self.vision_of(cell.pos);
                self.emit(
                    set,
                    Change::Destroyed {
                        subject: Descriptor::tile(cell.pos),
                        tile: token,
                    },
                    vision,
                );
            }
        }
    }

    fn hazard_shots(
        &mut self,
        desc: Descriptor,
        shots: i32,
        damage_per: i32,
        kind: HitKind,
        set: &mut ChangeSet,
    ) {
        if shots <= 0 || damage_per <= 0 {
            return;
        }
        let attackers = [Attacker {
            subject: Descriptor::cell(desc.position),
            token: UnitToken::default(),
            shots,
            damage: damage_per,
        }];
        let takers = [self.unit_taker(desc)];
        let hits = damage::resolve(&attackers, &takers, Background::default(), &mut self.rng);
        self.apply_hits(set, &hits, kind);
        self.bury_unit(desc, set);
    }

    fn decay_frostbite(&mut self, cell: Cell, set: &mut ChangeSet) {
        let targets: &[DescriptorKind] = if self.bible.frostbite_only_targets_ground_units {
            &[DescriptorKind::Ground]
        } else {
            &[
                DescriptorKind::Ground,
                DescriptorKind::Air,
                DescriptorKind::Bypass,
            ]
        };
        for &kind in targets {
            let desc = Descriptor {
                kind,
                position: cell.pos,
            };
            let unit = self.board.unit(desc);
            // Sealed mechanical units do not freeze.
            if unit.is_none() || self.bible.unit_mechanical[unit.typ] {
                continue;
            }
            let mut shots = self.bible.frostbite_shots;
            if self.bible.stack_based_frostbite {
                shots *= unit.stacks.max(0) as i32;
            }
            self.hazard_shots(
                desc,
                shots,
                self.bible.frostbite_damage,
                HitKind::Frostbitten,
                set,
            );
        }
    }

    fn decay_firestorm(&mut self, cell: Cell, set: &mut ChangeSet) {
        for kind in [
            DescriptorKind::Ground,
            DescriptorKind::Air,
            DescriptorKind::Bypass,
        ] {
            let desc = Descriptor {
                kind,
                position: cell.pos,
            };
            if self.board.unit(desc).is_some() {
                self.hazard_shots(
                    desc,
                    self.bible.firestorm_shots,
                    self.bible.firestorm_damage,
                    HitKind::Burned,
                    set,
                );
            }
        }
        let tile = self.board.tile(cell);
        if tile.is_some() && self.bible.tile_flammable[tile.typ] && tile.stacks > 0 {
            let attackers = [Attacker {
                subject: Descriptor::cell(cell.pos),
                token: UnitToken::default(),
                shots: self.bible.firestorm_shots,
                damage: self.bible.firestorm_damage,
            }];
            let takers = [self.tile_taker(cell)];
            let hits =
                damage::resolve(&attackers, &takers, Background::default(), &mut self.rng);
            self.apply_hits(set, &hits, HitKind::Burned);
            self.bury_tile(cell, true, set);
        }
    }

    fn decay_gas(&mut self, cell: Cell, set: &mut ChangeSet) {
        let targets: &[DescriptorKind] = if self.bible.gas_only_targets_ground_units {
            &[DescriptorKind::Ground, DescriptorKind::Bypass]
        } else {
            &[
                DescriptorKind::Ground,
                DescriptorKind::Air,
                DescriptorKind::Bypass,
            ]
        };
        for &kind in targets {
            let desc = Descriptor {
                kind,
                position: cell.pos,
            };
            let unit = self.board.unit(desc);
            // Gas chokes infantry; sealed mechanical units shrug it off.
            if unit.is_none() || !self.bible.unit_infantry[unit.typ] {
                continue;
            }
            self.hazard_shots(
                desc,
                self.bible.gas_shots,
                self.bible.gas_damage,
                HitKind::Gassed,
                set,
            );
        }
    }

    fn decay_radiation(&mut self, cell: Cell, set: &mut ChangeSet) {
        for kind in [
            DescriptorKind::Ground,
            DescriptorKind::Air,
            DescriptorKind::Bypass,
        ] {
            let desc = Descriptor {
                kind,
                position: cell.pos,
            };
            if self.board.unit(desc).is_some() {
                self.hazard_shots(
                    desc,
                    self.bible.radiation_shots,
                    self.bible.radiation_damage,
                    HitKind::Irradiated,
                    set,
                );
            }
        }
    }

    /// Leaking tiles and units raise their cell's gas and radiation, and
    /// standing pollution feeds chaos.
    fn leak(&mut self, set: &mut ChangeSet) {
        let pollute = !self.bible.ground_pollution_only_in_autumn || self.season == Season::Autumn;
        let mut updates: Vec<(usize, i8, i8, i8)> = Vec::new();
        for cell in self.board.cells() {
            let tile = self.board.tile(cell);
            let ground = self.board.ground(cell);
            let gas_leak =
                self.bible.tile_leak_gas[tile.typ] + self.bible.unit_leak_gas[ground.typ];
            let rad_leak =
                self.bible.tile_leak_rads[tile.typ] + self.bible.unit_leak_rads[ground.typ];
            let gas = (self.board.gas(cell) as i32 + gas_leak.max(0)).clamp(0, i8::MAX as i32);
            let rads =
                (self.board.radiation(cell) as i32 + rad_leak.max(0)).clamp(0, i8::MAX as i32);
            let mut chaos = self.board.chaos(cell) as i32;
            if pollute {
                if self.board.gas(cell) > 0 {
                    chaos += self.bible.gas_pollution_amount.max(0);
                }
                if self.board.radiation(cell) > 0 {
                    chaos += self.bible.radiation_pollution_amount.max(0);
                }
            }
            updates.push((
                cell.ix,
                gas as i8,
                rads as i8,
                chaos.clamp(0, 100) as i8,
            ));
        }
        for (ix, gas, rads, chaos) in updates {
            let cell = self.board.cell_at(ix);
            let subject = Descriptor::cell(cell.pos);
            if gas != self.board.gas(cell) {
                let vision = self.board.vision_at(cell);
                self.emit(set, Change::Gas { subject, value: gas }, vision);
            }
            if rads != self.board.radiation(cell) {
                let vision = self.board.vision_at(cell);
                self.emit(
                    set,
                    Change::Radiation {
                        subject,
                        value: rads,
                    },
                    vision,
                );
            }
            if chaos != self.board.chaos(cell) {
                let vision = self.board.vision_at(cell);
                self.emit(
                    set,
                    Change::Chaos {
                        subject,
                        value: chaos,
                    },
                    vision,
                );
            }
        }
    }

    // --- vision ----------------------------------------------------------

    fn computed_vision(&self) -> Vec<Vision> {
        let mut out = vec![Vision::none(); self.board.size()];
        for cell in self.board.cells() {
            let tile = self.board.tile(cell);
            if tile.is_some() && tile.owner.is_color() {
                let radius = self.bible.tile_vision[tile.typ].max(0);
                for seen in self.board.area(cell, 0, radius * radius) {
                    out[seen.ix].add(tile.owner);
                }
            }
            for kind in [
                DescriptorKind::Ground,
                DescriptorKind::Air,
                DescriptorKind::Bypass,
            ] {
                let unit = self.board.unit(Descriptor {
                    kind,
                    position: cell.pos,
                });
                if unit.is_some() && unit.owner.is_color() {
                    let radius = self.bible.unit_vision[unit.typ].max(0);
                    for seen in self.board.area(cell, 0, radius * radius) {
                        out[seen.ix].add(unit.owner);
                    }
                }
            }
        }
        // The defeated watch the rest of the match in full.
        for (&player, ledger) in &self.ledgers {
            if ledger.defeated {
                for vision in &mut out {
                    vision.add(player);
                }
            }
        }
        out
    }

    /// Reconcile fog of war after a chunk's mutations: players gaining a
    /// cell get a full disclosure, players losing it get an obscure.
    fn refresh_vision(&mut self, set: &mut ChangeSet) {
        let computed = self.computed_vision();
        let players = self.players.clone();
        for (ix, &new) in computed.iter().enumerate() {
            let cell = self.board.cell_at(ix);
            let old = self.board.vision_at(cell);
            if new == old {
                continue;
            }
            for &player in &players {
                let had = old.contains(player);
                let has = new.contains(player);
                if has && !had {
                    self.reveal_to(player, cell, set);
                } else if had && !has {
                    set.push(
                        Change::Obscure {
                            subject: Descriptor::cell(cell.pos),
                        },
                        Vision::only(player),
                    );
                }
            }
            self.board.set_vision(cell, new);
        }
    }

    fn reveal_to(&self, player: Player, cell: Cell, set: &mut ChangeSet) {
        let pos = cell.pos;
        set.push(
            Change::Reveal {
                subject: Descriptor::cell(pos),
                tile: self.board.tile(cell),
                snow: self.board.snow(cell),
                frostbite: self.board.frostbite(cell),
                firestorm: self.board.firestorm(cell),
                bonedrought: self.board.bonedrought(cell),
                death: self.board.death(cell),
                gas: self.board.gas(cell),
                radiation: self.board.radiation(cell),
                temperature: self.board.temperature(cell),
                humidity: self.board.humidity(cell),
                chaos: self.board.chaos(cell),
            },
            Vision::only(player),
        );
        for kind in [
            DescriptorKind::Ground,
            DescriptorKind::Air,
            DescriptorKind::Bypass,
        ] {
            let desc = Descriptor {
                kind,
                position: pos,
            };
            let unit = self.board.unit(desc);
            if unit.is_some() {
                set.push(
                    Change::Entered {
                        subject: desc,
                        unit,
                    },
                    Vision::only(player),
                );
            }
        }
    }

    // --- replay ----------------------------------------------------------

    fn act_as_replay(&mut self) -> ChangeSet {
        let (mode, recorded) = match self.replay.as_mut() {
            Some(replay) => (replay.mode, replay.sets.pop_front()),
            None => return ChangeSet::new(),
        };
        let Some(recorded) = recorded else {
            self.replay = None;
            return ChangeSet::new();
        };
        let result = match mode {
            ReplayMode::FromChanges => {
                for entry in recorded.entries() {
                    self.absorb(&entry.change);
                }
                recorded
            }
            ReplayMode::FromOrders => {
                let mut resigns: Vec<Player> = Vec::new();
                let mut submissions: Vec<(Player, Vec<Order>)> = Vec::new();
                for entry in recorded.entries() {
                    match &entry.change {
                        Change::Resigned { player } => resigns.push(*player),
                        Change::Ordered { player, order } => match submissions.last_mut() {
                            Some((last, orders)) if *last == *player => {
                                orders.push(order.clone())
                            }
                            _ => submissions.push((*player, vec![order.clone()])),
                        },
                        _ => {}
                    }
                }
                for player in resigns {
                    self.resign(player);
                }
                for (player, orders) in submissions {
                    self.receive(player, orders);
                }
                let computed = self.step_live();
                if !computed.equal(&recorded) {
                    warn!("replayed changeset differs from the recording");
                    debug_assert!(
                        computed.equal(&recorded),
                        "replayed changeset differs from the recording"
                    );
                }
                computed
            }
        };
        if self
            .replay
            .as_ref()
            .is_some_and(|replay| replay.sets.is_empty())
        {
            // A from-orders replay ends in a live, continuable match.
            self.replay = None;
        }
        result
    }

    /// Re-apply one recorded change: bookkeeping updates the automaton's
    /// own state, everything else goes through the board.
    fn absorb(&mut self, change: &Change) {
        match change {
            Change::Phase { phase } => {
                // The round counter ticks where the live path ticks it.
                if *phase == Phase::Growth {
                    self.round += 1;
                }
                self.phase = *phase;
            }
            Change::Daytime { daytime } => self.daytime = *daytime,
            Change::Season { season } => self.season = *season,
            Change::Funds { player, money } => self.set_money(*player, *money),
            Change::Resigned { player } => {
                if let Some(ledger) = self.ledgers.get_mut(player) {
                    ledger.resigned = true;
                }
            }
            Change::Defeat { player, .. } => {
                if let Some(ledger) = self.ledgers.get_mut(player) {
                    ledger.defeated = true;
                }
            }
            Change::GameOver { .. } => self.over = true,
            Change::Income { .. }
            | Change::Expenditure { .. }
            | Change::Ordered { .. }
            | Change::Discarded { .. }
            | Change::Postponed { .. }
            | Change::Unfinished { .. }
            | Change::Scored { .. }
            | Change::Initiative { .. }
            | Change::Reveal { .. }
            | Change::Obscure { .. } => {}
            other => self.board.enact(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapCell;
    use smallvec::smallvec;

    /// A 3×6 strip: a city for red and blue each, so neither side starts
    /// defeated, and a free middle row for unit scenarios.
    fn scenario_map(unit: &str, at_row: i16, at_col: i16) -> Map {
        let mut cells: Vec<MapCell> = (0..18).map(|_| MapCell::terrain("grass")).collect();
        cells[0] = MapCell {
            tile: "city".to_string(),
            owner: Player::Red,
            unit: None,
        };
        cells[17] = MapCell {
            tile: "city".to_string(),
            owner: Player::Blue,
            unit: None,
        };
        let ix = at_row as usize * 6 + at_col as usize;
        cells[ix].owner = Player::Red;
        cells[ix].unit = Some(unit.to_string());
        Map {
            name: "scenario".to_string(),
            rows: 3,
            cols: 6,
            cells,
        }
    }

    fn new_match(map: &Map) -> Automaton {
        Automaton::new(
            vec![Player::Red, Player::Blue],
            Bible::current(),
            map,
            42,
        )
    }

    fn drain(auto: &mut Automaton) -> Vec<ChangeSet> {
        let mut sets = Vec::new();
        while auto.active() {
            sets.push(auto.act());
        }
        sets
    }

    /// Start chunk, then the resting→planning transition.
    fn open_planning(auto: &mut Automaton) -> Vec<ChangeSet> {
        let mut sets = drain(auto);
        assert_eq!(auto.phase(), Phase::Resting);
        sets.push(auto.act());
        assert_eq!(auto.phase(), Phase::Planning);
        sets
    }

    /// Close planning and run the round to the next resting phase.
    fn run_round(auto: &mut Automaton) -> Vec<ChangeSet> {
        let mut sets = drain(auto);
        sets.push(auto.act());
        sets.extend(drain(auto));
        sets
    }

    fn changes_of(sets: &[ChangeSet]) -> Vec<Change> {
        sets.iter()
            .flat_map(|s| s.entries().iter().map(|e| e.change.clone()))
            .collect()
    }

    #[test]
    fn opening_chunk_funds_and_reveals() {
        let mut auto = new_match(&Map::demo());
        let start = auto.act();
        let red: Vec<&Change> = start.for_player(Player::Red);
        assert!(red
            .iter()
            .any(|c| matches!(c, Change::Funds { player: Player::Red, money: 20 })));
        assert!(red.iter().any(|c| matches!(c, Change::Reveal { .. })));
        // Blue must not see red's funds.
        assert!(!start
            .for_player(Player::Blue)
            .iter()
            .any(|c| matches!(c, Change::Funds { player: Player::Red, .. })));
        assert_eq!(auto.phase(), Phase::Resting);
        assert!(!auto.active());
    }

    #[test]
    fn full_round_runs_to_the_next_resting() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let sets = run_round(&mut auto);
        assert_eq!(auto.phase(), Phase::Resting);
        assert_eq!(auto.round(), 2);
        assert!(!auto.active());
        let all = changes_of(&sets);
        // The phase cycle was announced in order.
        let phases: Vec<Phase> = all
            .iter()
            .filter_map(|c| match c {
                Change::Phase { phase } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::Staging,
                Phase::Action,
                Phase::Decay,
                Phase::Growth,
                Phase::Resting
            ]
        );
    }

    #[test]
    fn receive_queues_orders_and_replaces_same_subject() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 2));
        auto.receive(
            Player::Red,
            vec![
                Order::Move {
                    subject,
                    moves: smallvec![Position::new(1, 3)],
                },
                Order::Capture { subject },
            ],
        );
        let set = auto.act();
        let ordered = set
            .entries()
            .iter()
            .filter(|e| matches!(e.change, Change::Ordered { .. }))
            .count();
        assert_eq!(ordered, 2);
        // The capture replaced the move: one standing order remains.
        let ledger = auto.ledgers.get(&Player::Red).unwrap();
        assert_eq!(ledger.orders.len(), 1);
        assert!(matches!(ledger.orders[0], Order::Capture { .. }));
    }

    #[test]
    fn orders_beyond_the_limit_are_dropped() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let orders: Vec<Order> = (0..7)
            .map(|col| Order::Halt {
                subject: Descriptor::ground(Position::new(0, col)),
            })
            .collect();
        auto.receive(Player::Red, orders);
        auto.act();
        let limit = auto.bible().new_order_limit as usize;
        assert_eq!(auto.ledgers.get(&Player::Red).unwrap().orders.len(), limit);
    }

    #[test]
    fn move_order_walks_and_finishes() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 2));
        auto.receive(
            Player::Red,
            vec![Order::Move {
                subject,
                moves: smallvec![
                    Position::new(2, 2),
                    Position::new(3, 2),
                    Position::new(4, 2)
                ],
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        let steps = all
            .iter()
            .filter(|c| matches!(c, Change::Moves { .. }))
            .count();
        // Rifleman speed 3: all three steps this round, order cleared.
        assert_eq!(steps, 3);
        assert!(auto
            .board()
            .unit(Descriptor::ground(Position::new(4, 2)))
            .is_some());
        assert!(auto.ledgers.get(&Player::Red).unwrap().orders.is_empty());
    }

    /// A speed-2 unit whose first step lands on snow with slow amount and
    /// maximum 1 completes one of two steps and retains the remainder.
    #[test]
    fn snowed_step_halves_the_move_and_leaves_it_unfinished() {
        let map = scenario_map("gunner", 1, 1);
        let mut auto = new_match(&map);
        auto.board.enact(&Change::Snow {
            subject: Descriptor::cell(Position::new(1, 2)),
            value: true,
        });
        assert_eq!(auto.bible().snow_slow_amount, 1);
        assert_eq!(auto.bible().snow_slow_maximum, 1);
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 1));
        auto.receive(
            Player::Red,
            vec![Order::Move {
                subject,
                moves: smallvec![Position::new(1, 2), Position::new(1, 3)],
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        let steps = all
            .iter()
            .filter(|c| matches!(c, Change::Moves { .. }))
            .count();
        assert_eq!(steps, 1);
        assert!(auto
            .board()
            .unit(Descriptor::ground(Position::new(1, 2)))
            .is_some());
        // The remainder was retained for next round.
        let retained = all.iter().find_map(|c| match c {
            Change::Unfinished {
                order: Order::Move { moves, .. },
                ..
            } => Some(moves.clone()),
            _ => None,
        });
        assert_eq!(retained.unwrap().as_slice(), &[Position::new(1, 3)]);
        let ledger = auto.ledgers.get(&Player::Red).unwrap();
        assert_eq!(ledger.orders.len(), 1);
    }

    #[test]
    fn move_into_a_friendly_body_without_an_exit_is_postponed() {
        let map = scenario_map("rifleman", 1, 1);
        let mut auto = new_match(&map);
        auto.board.place_unit(
            Descriptor::ground(Position::new(1, 2)),
            UnitToken {
                typ: auto.bible.unit_type("militia"),
                owner: Player::Red,
                stacks: 1,
            },
        );
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 1));
        auto.receive(
            Player::Red,
            vec![Order::Move {
                subject,
                moves: smallvec![Position::new(1, 2)],
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        // No onward waypoint, so the friendly body cannot be bypassed.
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Postponed {
                notice: Notice::OccupiedByAlly,
                ..
            }
        )));
        assert!(auto
            .board()
            .unit(Descriptor::ground(Position::new(1, 1)))
            .is_some());
        assert_eq!(auto.ledgers.get(&Player::Red).unwrap().orders.len(), 1);
    }

    /// Capturing a power-3 tile with a 2-stack unit under the strength
    /// check postpones with a lacking-stacks notice and changes nothing.
    #[test]
    fn capture_against_stronger_tile_is_postponed() {
        let map = scenario_map("rifleman", 1, 1);
        let mut auto = new_match(&map);
        assert!(auto.bible().capture_strength_check);
        // The blue city at (2, 5) pumped to power 3; a two-stack red
        // rifleman standing on top of it.
        auto.board.enact(&Change::Grows {
            subject: Descriptor::tile(Position::new(2, 5)),
            stacks: 1,
            power: 3,
        });
        let subject = Descriptor::ground(Position::new(2, 5));
        let rifleman = auto.bible.unit_type("rifleman");
        auto.board.place_unit(
            subject,
            UnitToken {
                typ: rifleman,
                owner: Player::Red,
                stacks: 2,
            },
        );
        assert_eq!(auto.board().unit(subject).stacks, 2);
        open_planning(&mut auto);
        auto.receive(Player::Red, vec![Order::Capture { subject }]);
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Postponed {
                notice: Notice::LackingStacks,
                ..
            }
        )));
        let cell = auto.board().cell(Position::new(2, 5)).unwrap();
        assert_eq!(auto.board().tile(cell).owner, Player::Blue);
        assert_eq!(auto.ledgers.get(&Player::Red).unwrap().orders.len(), 1);
    }

    #[test]
    fn capture_with_enough_stacks_takes_the_tile() {
        let map = scenario_map("rifleman", 1, 1);
        let mut auto = new_match(&map);
        let subject = Descriptor::ground(Position::new(2, 5));
        let rifleman = auto.bible.unit_type("rifleman");
        auto.board.place_unit(
            subject,
            UnitToken {
                typ: rifleman,
                owner: Player::Red,
                stacks: 3,
            },
        );
        // City power 1 against three stacks: the check passes.
        open_planning(&mut auto);
        auto.receive(Player::Red, vec![Order::Capture { subject }]);
        run_round(&mut auto);
        let cell = auto.board().cell(Position::new(2, 5)).unwrap();
        assert_eq!(auto.board().tile(cell).owner, Player::Red);
        // Blue lost its only binding tile and the match concluded.
        assert!(auto.defeated(Player::Blue));
        assert!(auto.game_over());
    }

    #[test]
    fn guard_strikes_an_adjacent_enemy() {
        let map = scenario_map("rifleman", 1, 1);
        let mut auto = new_match(&map);
        let victim = Descriptor::ground(Position::new(1, 2));
        auto.board.place_unit(
            victim,
            UnitToken {
                typ: auto.bible().unit_type("militia"),
                owner: Player::Blue,
                stacks: 5,
            },
        );
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 1));
        auto.receive(
            Player::Red,
            vec![Order::Guard {
                subject,
                target: Position::new(1, 2),
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        // Three stacks, one shot each, no miss background on open ground.
        let hits = all
            .iter()
            .filter(|c| matches!(c, Change::Attacked { .. }))
            .count();
        assert_eq!(hits, 3);
        assert!(all.iter().any(|c| matches!(c, Change::Survived { .. })));
        assert_eq!(auto.board().unit(victim).stacks, 2);
        // The guard stands for next round.
        assert_eq!(auto.ledgers.get(&Player::Red).unwrap().orders.len(), 1);
    }

    #[test]
    fn cold_feet_discards_attack_orders_in_spring() {
        let map = scenario_map("rifleman", 1, 1);
        let mut auto = new_match(&map);
        assert!(auto.bible().cold_feet_in_spring);
        auto.board.enact(&Change::Frostbite {
            subject: Descriptor::cell(Position::new(1, 1)),
            value: true,
        });
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 1));
        auto.receive(
            Player::Red,
            vec![Order::Guard {
                subject,
                target: Position::new(1, 2),
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Discarded {
                notice: Notice::ColdFeet,
                ..
            }
        )));
        assert!(auto.ledgers.get(&Player::Red).unwrap().orders.is_empty());
    }

    #[test]
    fn production_without_funds_is_postponed() {
        let json = {
            let mut doc = Bible::current().to_json();
            doc["startingMoney"] = serde_json::json!(0);
            doc
        };
        let bible = Bible::from_json(&json).unwrap();
        let map = scenario_map("rifleman", 1, 4);
        let mut auto = Automaton::new(vec![Player::Red, Player::Blue], bible, &map, 42);
        open_planning(&mut auto);
        let subject = Descriptor::tile(Position::new(0, 0));
        auto.receive(
            Player::Red,
            vec![Order::Produce {
                subject,
                target: Position::new(0, 1),
                unit: auto.bible().unit_type("militia"),
            }],
        );
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Postponed {
                notice: Notice::LackingMoney,
                ..
            }
        )));
        assert!(auto
            .board()
            .unit(Descriptor::ground(Position::new(0, 1)))
            .is_none());
    }

    #[test]
    fn production_trains_a_unit_nearby() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let subject = Descriptor::tile(Position::new(1, 1));
        auto.receive(
            Player::Red,
            vec![Order::Produce {
                subject,
                target: Position::new(2, 1),
                unit: auto.bible().unit_type("militia"),
            }],
        );
        let before = auto.money(Player::Red);
        run_round(&mut auto);
        let trained = auto.board().unit(Descriptor::ground(Position::new(2, 1)));
        assert!(trained.is_some());
        assert_eq!(trained.owner, Player::Red);
        // Militia from a city costs its override of five; the round's city
        // income pays one back.
        assert_eq!(auto.money(Player::Red), before - 5 + 1);
    }

    #[test]
    fn resignation_defeats_and_concludes_the_match() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        auto.resign(Player::Red);
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all
            .iter()
            .any(|c| matches!(c, Change::Resigned { player: Player::Red })));
        assert!(all
            .iter()
            .any(|c| matches!(c, Change::Defeat { player: Player::Red, .. })));
        // Red's tiles were released to nobody in the defeat changeset.
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Captured {
                player: Player::None,
                ..
            }
        )));
        assert!(all.iter().any(|c| matches!(c, Change::GameOver { .. })));
        assert!(auto.defeated(Player::Red));
        assert!(auto.game_over());
        assert!(!auto.active());
        // The whole map is revealed to the defeated.
        for cell in auto.board().cells() {
            assert!(auto.board().vision_at(cell).contains(Player::Red));
        }
    }

    #[test]
    fn rejoin_discloses_exactly_the_visible_cells() {
        let mut auto = new_match(&Map::demo());
        auto.act();
        let visible = auto
            .board()
            .cells()
            .filter(|&c| auto.board().vision_at(c).contains(Player::Blue))
            .count();
        assert!(visible > 0);
        let catchup = auto.rejoin(Player::Blue);
        let reveals = catchup
            .for_player(Player::Blue)
            .iter()
            .filter(|c| matches!(c, Change::Reveal { .. }))
            .count();
        assert_eq!(reveals, visible);
        // An observer gets the whole board.
        let observer = auto.rejoin(Player::Observer);
        let all_cells = auto.board().size();
        let observer_reveals = observer
            .for_player(Player::Observer)
            .iter()
            .filter(|c| matches!(c, Change::Reveal { .. }))
            .count();
        assert_eq!(observer_reveals, all_cells);
    }

    #[test]
    fn halt_finishes_with_a_private_notice() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let subject = Descriptor::ground(Position::new(1, 2));
        auto.receive(Player::Red, vec![Order::Halt { subject }]);
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all.iter().any(|c| matches!(
            c,
            Change::Discarded {
                notice: Notice::Halted,
                ..
            }
        )));
        assert!(auto.ledgers.get(&Player::Red).unwrap().orders.is_empty());
    }

    #[test]
    fn growth_pays_income_from_laboring_tiles() {
        let mut auto = new_match(&Map::demo());
        open_planning(&mut auto);
        let before = auto.money(Player::Red);
        let sets = run_round(&mut auto);
        let all = changes_of(&sets);
        assert!(all
            .iter()
            .any(|c| matches!(c, Change::Income { player: Player::Red, .. })));
        assert!(auto.money(Player::Red) > before);
    }
}
