#![recursion_limit = "512"]
// ashveld_sim — deterministic turn-based match engine.
//
// This crate contains the whole simulation core for Ashveld: the ruleset
// table, the board, the event model, the environmental passes, combat math
// and the turn state machine. It has no rendering, network or launcher
// dependencies and runs headless; the UI and session layers consume it
// through the `Automaton` surface and the recording format only.
//
// Module overview:
// - `automaton.rs`:  Top-level turn state machine, order processing, replay.
// - `bible.rs`:      The ruleset ("Bible") — every rule constant, JSON I/O.
// - `board.rs`:      Dense per-cell grid state, `enact`, the `Area` shape.
// - `change.rs`:     Change/ChangeSet — the atomic observable events.
// - `damage.rs`:     Combat math: shots, misses, figure-by-figure hits.
// - `map.rs`:        Skirmish map model and loader.
// - `order.rs`:      Player orders and the four terminal dispositions.
// - `randomizer.rs`: Weighted shuffle without replacement.
// - `recording.rs`:  Append-only match log, one JSON value per line.
// - `registry.rs`:   Bidirectional type-name table.
// - `transition.rs`: The seven two-phase environmental grid sweeps.
// - `vision.rs`:     Per-change player visibility bitset.
// - `player.rs`, `season.rs`, `position.rs`, `token.rs`, `notice.rs`,
//   `version.rs`, `error.rs`: leaf vocabulary types.
// - `prng`:          Re-exported from `ashveld_prng` — xoshiro256++ with
//   SplitMix64 seeding.
//
// **Critical constraint: determinism.** A match is a pure function of
// (ruleset, initial map, ordered input orders, RNG seed). All randomness
// comes from one seeded `MatchRng` stream; ordered collections are
// `BTreeMap` or plain vectors, never `HashMap`; nothing observable happens
// outside of a `Change`.

pub mod automaton;
pub mod bible;
pub mod board;
pub mod change;
pub mod damage;
pub mod error;
pub mod map;
pub mod notice;
pub mod order;
pub mod player;
pub mod position;
pub use ashveld_prng as prng;
pub mod randomizer;
pub mod recording;
pub mod registry;
pub mod season;
pub mod token;
pub mod transition;
pub mod version;
pub mod vision;
