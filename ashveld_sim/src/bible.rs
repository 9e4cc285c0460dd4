// The Bible: the immutable, versioned ruleset table.
//
// Every numeric and boolean parameter governing tiles, units, combat,
// weather and economy lives here, loadable from JSON and serializable back
// losslessly enough that `Bible::from_json(bible.to_json()) == bible`.
// That round-trip law is what lets a replay verify "the ruleset baked into
// this recording matches the ruleset installed locally" with plain
// structural equality.
//
// Each field is declared exactly once in the `bible_table!` invocation at
// the bottom of the schema section — name, container kind, JSON key, and
// historical key aliases — and the macro generates the struct, the
// single-pass fill (new-style key if present, else aliases in order, else
// the type default) and the save. Computed compatibility rules that one
// alias cannot express (a legacy scalar splitting into two fields, say)
// are applied by hand in `from_json` after the fill.
//
// Per-type containers are plain arrays indexed by type code, bounded by
// `TILE_TYPE_MAX`/`UNIT_TYPE_MAX`; the two `TypeRegistry` tables inside
// the bible give codes their names. Unknown type words in ruleset JSON
// resolve to the absent type rather than erroring, so old rulesets naming
// retired types still load. Unparsable season words are a hard
// `ParseError` — that is a malformed document, not a retired name.
//
// `finalize()` resolves build-cost placeholders: a build-list entry with
// no explicit cost inherits the built type's base cost.
//
// **Critical constraint: determinism.** The bible is immutable after
// construction and shared by reference; two equal bibles must behave
// identically in every code path.

use crate::error::ParseError;
use crate::registry::{TILE_TYPE_MAX, TypeRegistry, UNIT_TYPE_MAX};
use crate::season::Season;
use crate::token::{TileType, UnitType};
use crate::version::Version;
use serde_json::{Map, Value, json};
use std::ops::{Index, IndexMut};

// ---------------------------------------------------------------------------
// Per-type containers
// ---------------------------------------------------------------------------

/// A value per tile type, indexed by type code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap<T> {
    values: [T; TILE_TYPE_MAX],
}

/// A value per unit type, indexed by type code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitMap<T> {
    values: [T; UNIT_TYPE_MAX],
}

impl<T: Default> Default for TileMap<T> {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| T::default()),
        }
    }
}

impl<T: Default> Default for UnitMap<T> {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| T::default()),
        }
    }
}

impl<T> Index<TileType> for TileMap<T> {
    type Output = T;

    fn index(&self, typ: TileType) -> &T {
        &self.values[typ.0 as usize]
    }
}

impl<T> IndexMut<TileType> for TileMap<T> {
    fn index_mut(&mut self, typ: TileType) -> &mut T {
        &mut self.values[typ.0 as usize]
    }
}

impl<T> Index<UnitType> for UnitMap<T> {
    type Output = T;

    fn index(&self, typ: UnitType) -> &T {
        &self.values[typ.0 as usize]
    }
}

impl<T> IndexMut<UnitType> for UnitMap<T> {
    fn index_mut(&mut self, typ: UnitType) -> &mut T {
        &mut self.values[typ.0 as usize]
    }
}

/// An int per season. Encoded in JSON as either a bare int applied to all
/// four seasons or an explicit `{"spring": …, …}` map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeasonMap {
    values: [i32; 4],
}

impl SeasonMap {
    pub const fn uniform(value: i32) -> Self {
        Self { values: [value; 4] }
    }
}

impl Index<Season> for SeasonMap {
    type Output = i32;

    fn index(&self, season: Season) -> &i32 {
        &self.values[season.index()]
    }
}

impl IndexMut<Season> for SeasonMap {
    fn index_mut(&mut self, season: Season) -> &mut i32 {
        &mut self.values[season.index()]
    }
}

/// One entry of a tile build list: what can be built and at what cost.
/// A missing cost is a placeholder resolved by `finalize()` to the built
/// type's base cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileBuild {
    pub tile: TileType,
    pub cost: Option<i32>,
}

/// One entry of a unit build list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitBuild {
    pub unit: UnitType,
    pub cost: Option<i32>,
}

impl TileBuild {
    /// The resolved cost. Finalization guarantees `Some`.
    pub fn cost(&self) -> i32 {
        debug_assert!(self.cost.is_some(), "build cost left unresolved");
        self.cost.unwrap_or(0)
    }
}

impl UnitBuild {
    pub fn cost(&self) -> i32 {
        debug_assert!(self.cost.is_some(), "build cost left unresolved");
        self.cost.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// JSON encoding helpers
// ---------------------------------------------------------------------------

/// First value present under any of the given keys, in order. The primary
/// (new-style) key is first; historical aliases follow.
fn lookup<'a>(json: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| json.get(*k))
}

fn load_tile_bools(
    json: &Map<String, Value>,
    keys: &[&str],
    reg: &TypeRegistry,
) -> TileMap<bool> {
    let mut out = TileMap::default();
    if let Some(Value::Array(names)) = lookup(json, keys) {
        for name in names {
            if let Some(word) = name.as_str() {
                // Unknown words resolve to the absent type and are dropped.
                if let Some(code) = reg.code(word).filter(|&c| c != 0) {
                    out[TileType(code)] = true;
                }
            }
        }
    }
    out
}

fn save_tile_bools(map: &TileMap<bool>, reg: &TypeRegistry) -> Value {
    let names: Vec<Value> = (1..reg.len() as u8)
        .filter(|&c| map[TileType(c)])
        .map(|c| Value::String(reg.name(c).to_string()))
        .collect();
    Value::Array(names)
}

fn load_unit_bools(
    json: &Map<String, Value>,
    keys: &[&str],
    reg: &TypeRegistry,
) -> UnitMap<bool> {
    let mut out = UnitMap::default();
    if let Some(Value::Array(names)) = lookup(json, keys) {
        for name in names {
            if let Some(word) = name.as_str() {
                if let Some(code) = reg.code(word).filter(|&c| c != 0) {
                    out[UnitType(code)] = true;
                }
            }
        }
    }
    out
}

fn save_unit_bools(map: &UnitMap<bool>, reg: &TypeRegistry) -> Value {
    let names: Vec<Value> = (1..reg.len() as u8)
        .filter(|&c| map[UnitType(c)])
        .map(|c| Value::String(reg.name(c).to_string()))
        .collect();
    Value::Array(names)
}

fn load_tile_ints(json: &Map<String, Value>, keys: &[&str], reg: &TypeRegistry) -> TileMap<i32> {
    let mut out = TileMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            if let (Some(code), Some(v)) =
                (reg.code(word).filter(|&c| c != 0), value.as_i64())
            {
                out[TileType(code)] = v as i32;
            }
        }
    }
    out
}

fn save_tile_ints(map: &TileMap<i32>, reg: &TypeRegistry) -> Value {
    let mut entries = Map::new();
    for c in 1..reg.len() as u8 {
        entries.insert(reg.name(c).to_string(), json!(map[TileType(c)]));
    }
    Value::Object(entries)
}

fn load_unit_ints(json: &Map<String, Value>, keys: &[&str], reg: &TypeRegistry) -> UnitMap<i32> {
    let mut out = UnitMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            if let (Some(code), Some(v)) =
                (reg.code(word).filter(|&c| c != 0), value.as_i64())
            {
                out[UnitType(code)] = v as i32;
            }
        }
    }
    out
}

fn save_unit_ints(map: &UnitMap<i32>, reg: &TypeRegistry) -> Value {
    let mut entries = Map::new();
    for c in 1..reg.len() as u8 {
        entries.insert(reg.name(c).to_string(), json!(map[UnitType(c)]));
    }
    Value::Object(entries)
}

fn load_tile_tiles(
    json: &Map<String, Value>,
    keys: &[&str],
    reg: &TypeRegistry,
) -> TileMap<TileType> {
    let mut out = TileMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            if let (Some(from), Some(to_word)) =
                (reg.code(word).filter(|&c| c != 0), value.as_str())
            {
                // An unknown target word resolves to the absent type.
                let to = reg.code(to_word).unwrap_or(0);
                out[TileType(from)] = TileType(to);
            }
        }
    }
    out
}

fn save_tile_tiles(map: &TileMap<TileType>, reg: &TypeRegistry) -> Value {
    let mut entries = Map::new();
    for c in 1..reg.len() as u8 {
        let target = map[TileType(c)];
        if target.is_some() {
            entries.insert(
                reg.name(c).to_string(),
                Value::String(reg.name(target.0).to_string()),
            );
        }
    }
    Value::Object(entries)
}

fn load_build_entry(value: &Value, reg: &TypeRegistry) -> Option<(u8, Option<i32>)> {
    match value {
        // Either a bare type word…
        Value::String(word) => reg.code(word).filter(|&c| c != 0).map(|c| (c, None)),
        // …or an object with an optional cost override.
        Value::Object(entry) => {
            let word = entry.get("type")?.as_str()?;
            let code = reg.code(word).filter(|&c| c != 0)?;
            let cost = entry.get("cost").and_then(Value::as_i64).map(|v| v as i32);
            Some((code, cost))
        }
        _ => None,
    }
}

fn load_tile_unit_builds(
    json: &Map<String, Value>,
    keys: &[&str],
    tiles: &TypeRegistry,
    units: &TypeRegistry,
) -> TileMap<Vec<UnitBuild>> {
    let mut out: TileMap<Vec<UnitBuild>> = TileMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            let Some(code) = tiles.code(word).filter(|&c| c != 0) else {
                continue;
            };
            if let Value::Array(list) = value {
                for entry in list {
                    if let Some((unit, cost)) = load_build_entry(entry, units) {
                        out[TileType(code)].push(UnitBuild {
                            unit: UnitType(unit),
                            cost,
                        });
                    }
                }
            }
        }
    }
    out
}

fn save_tile_unit_builds(
    map: &TileMap<Vec<UnitBuild>>,
    tiles: &TypeRegistry,
    units: &TypeRegistry,
) -> Value {
    let mut entries = Map::new();
    for c in 1..tiles.len() as u8 {
        let builds = &map[TileType(c)];
        if builds.is_empty() {
            continue;
        }
        let list: Vec<Value> = builds
            .iter()
            .map(|b| {
                json!({
                    "type": units.name(b.unit.0),
                    "cost": b.cost,
                })
            })
            .collect();
        entries.insert(tiles.name(c).to_string(), Value::Array(list));
    }
    Value::Object(entries)
}

fn load_tile_tile_builds(
    json: &Map<String, Value>,
    keys: &[&str],
    tiles: &TypeRegistry,
) -> TileMap<Vec<TileBuild>> {
    let mut out: TileMap<Vec<TileBuild>> = TileMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            let Some(code) = tiles.code(word).filter(|&c| c != 0) else {
                continue;
            };
            if let Value::Array(list) = value {
                for entry in list {
                    if let Some((tile, cost)) = load_build_entry(entry, tiles) {
                        out[TileType(code)].push(TileBuild {
                            tile: TileType(tile),
                            cost,
                        });
                    }
                }
            }
        }
    }
    out
}

fn save_tile_tile_builds(map: &TileMap<Vec<TileBuild>>, tiles: &TypeRegistry) -> Value {
    let mut entries = Map::new();
    for c in 1..tiles.len() as u8 {
        let builds = &map[TileType(c)];
        if builds.is_empty() {
            continue;
        }
        let list: Vec<Value> = builds
            .iter()
            .map(|b| {
                json!({
                    "type": tiles.name(b.tile.0),
                    "cost": b.cost,
                })
            })
            .collect();
        entries.insert(tiles.name(c).to_string(), Value::Array(list));
    }
    Value::Object(entries)
}

fn load_unit_tile_builds(
    json: &Map<String, Value>,
    keys: &[&str],
    units: &TypeRegistry,
    tiles: &TypeRegistry,
) -> UnitMap<Vec<TileBuild>> {
    let mut out: UnitMap<Vec<TileBuild>> = UnitMap::default();
    if let Some(Value::Object(entries)) = lookup(json, keys) {
        for (word, value) in entries {
            let Some(code) = units.code(word).filter(|&c| c != 0) else {
                continue;
            };
            if let Value::Array(list) = value {
                for entry in list {
                    if let Some((tile, cost)) = load_build_entry(entry, tiles) {
                        out[UnitType(code)].push(TileBuild {
                            tile: TileType(tile),
                            cost,
                        });
                    }
                }
            }
        }
    }
    out
}

fn save_unit_tile_builds(
    map: &UnitMap<Vec<TileBuild>>,
    units: &TypeRegistry,
    tiles: &TypeRegistry,
) -> Value {
    let mut entries = Map::new();
    for c in 1..units.len() as u8 {
        let builds = &map[UnitType(c)];
        if builds.is_empty() {
            continue;
        }
        let list: Vec<Value> = builds
            .iter()
            .map(|b| {
                json!({
                    "type": tiles.name(b.tile.0),
                    "cost": b.cost,
                })
            })
            .collect();
        entries.insert(units.name(c).to_string(), Value::Array(list));
    }
    Value::Object(entries)
}

fn load_season_ints(
    json: &Map<String, Value>,
    keys: &[&str],
    default: i32,
) -> Result<SeasonMap, ParseError> {
    match lookup(json, keys) {
        // A bare int applies to all four seasons.
        Some(Value::Number(n)) => Ok(SeasonMap::uniform(n.as_i64().unwrap_or(0) as i32)),
        Some(Value::Object(entries)) => {
            let mut out = SeasonMap::uniform(default);
            for (word, value) in entries {
                // Unknown season words are a malformed document, not a
                // retired name — raise.
                let season: Season = word.parse()?;
                out[season] = value.as_i64().unwrap_or(0) as i32;
            }
            Ok(out)
        }
        _ => Ok(SeasonMap::uniform(default)),
    }
}

fn save_season_ints(map: &SeasonMap) -> Value {
    json!({
        "spring": map[Season::Spring],
        "summer": map[Season::Summer],
        "autumn": map[Season::Autumn],
        "winter": map[Season::Winter],
    })
}

fn load_int(json: &Map<String, Value>, keys: &[&str], default: i32) -> i32 {
    lookup(json, keys)
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .unwrap_or(default)
}

fn load_bool(json: &Map<String, Value>, keys: &[&str], default: bool) -> bool {
    lookup(json, keys).and_then(Value::as_bool).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// The field table
// ---------------------------------------------------------------------------

macro_rules! bible_field_type {
    (tile_bool) => { TileMap<bool> };
    (tile_int) => { TileMap<i32> };
    (tile_tile) => { TileMap<TileType> };
    (tile_unit_builds) => { TileMap<Vec<UnitBuild>> };
    (tile_tile_builds) => { TileMap<Vec<TileBuild>> };
    (unit_bool) => { UnitMap<bool> };
    (unit_int) => { UnitMap<i32> };
    (unit_tile_builds) => { UnitMap<Vec<TileBuild>> };
    (season_int) => { SeasonMap };
    (int) => { i32 };
    (bool) => { bool };
}

macro_rules! bible_field_load {
    (tile_bool, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_tile_bools($json, $keys, &$bible.tile_registry);
    };
    (tile_int, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_tile_ints($json, $keys, &$bible.tile_registry);
    };
    (tile_tile, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_tile_tiles($json, $keys, &$bible.tile_registry);
    };
    (tile_unit_builds, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field =
            load_tile_unit_builds($json, $keys, &$bible.tile_registry, &$bible.unit_registry);
    };
    (tile_tile_builds, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_tile_tile_builds($json, $keys, &$bible.tile_registry);
    };
    (unit_bool, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_unit_bools($json, $keys, &$bible.unit_registry);
    };
    (unit_int, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_unit_ints($json, $keys, &$bible.unit_registry);
    };
    (unit_tile_builds, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field =
            load_unit_tile_builds($json, $keys, &$bible.unit_registry, &$bible.tile_registry);
    };
    (season_int, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_season_ints($json, $keys, $default)?;
    };
    (int, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_int($json, $keys, $default);
    };
    (bool, $bible:ident, $json:ident, $field:ident, $keys:expr, $default:expr) => {
        $bible.$field = load_bool($json, $keys, $default);
    };
}

macro_rules! bible_field_save {
    (tile_bool, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_tile_bools(&$bible.$field, &$bible.tile_registry),
        );
    };
    (tile_int, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_tile_ints(&$bible.$field, &$bible.tile_registry),
        );
    };
    (tile_tile, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_tile_tiles(&$bible.$field, &$bible.tile_registry),
        );
    };
    (tile_unit_builds, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_tile_unit_builds(&$bible.$field, &$bible.tile_registry, &$bible.unit_registry),
        );
    };
    (tile_tile_builds, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_tile_tile_builds(&$bible.$field, &$bible.tile_registry),
        );
    };
    (unit_bool, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_unit_bools(&$bible.$field, &$bible.unit_registry),
        );
    };
    (unit_int, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_unit_ints(&$bible.$field, &$bible.unit_registry),
        );
    };
    (unit_tile_builds, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert(
            $key.to_string(),
            save_unit_tile_builds(&$bible.$field, &$bible.unit_registry, &$bible.tile_registry),
        );
    };
    (season_int, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert($key.to_string(), save_season_ints(&$bible.$field));
    };
    (int, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert($key.to_string(), json!($bible.$field));
    };
    (bool, $bible:ident, $map:ident, $field:ident, $key:literal) => {
        $map.insert($key.to_string(), json!($bible.$field));
    };
}

macro_rules! bible_table {
    (
        $(
            $kind:ident $field:ident : $key:literal
                $(, aliases [$($alias:literal),*])?
                $(, default $default:expr)? ;
        )*
    ) => {
        /// The complete ruleset. Immutable after `from_json`/`finalize`.
        #[derive(Clone, Debug, PartialEq)]
        pub struct Bible {
            pub version: Version,
            tile_registry: TypeRegistry,
            unit_registry: TypeRegistry,
            $( pub $field: bible_field_type!($kind), )*
        }

        impl Bible {
            fn empty() -> Self {
                Self {
                    version: Version::current(),
                    tile_registry: TypeRegistry::new("tile", TILE_TYPE_MAX),
                    unit_registry: TypeRegistry::new("unit", UNIT_TYPE_MAX),
                    $( $field: bible_default!($kind $(, $default)?), )*
                }
            }

            /// The single-pass fill: for every field, the new-style key if
            /// present, else its aliases in order, else the default.
            fn fill(&mut self, json: &Map<String, Value>) -> Result<(), ParseError> {
                $(
                    bible_field_load!(
                        $kind, self, json, $field,
                        &[$key $($(, $alias)*)?],
                        bible_scalar_default!($($default)?)
                    );
                )*
                Ok(())
            }

            fn save(&self) -> Map<String, Value> {
                let mut map = Map::new();
                map.insert("version".to_string(), json!(self.version));
                map.insert(
                    "tiletypes".to_string(),
                    Value::Array(
                        self.tile_registry
                            .names()
                            .map(|n| Value::String(n.to_string()))
                            .collect(),
                    ),
                );
                map.insert(
                    "unittypes".to_string(),
                    Value::Array(
                        self.unit_registry
                            .names()
                            .map(|n| Value::String(n.to_string()))
                            .collect(),
                    ),
                );
                $( bible_field_save!($kind, self, map, $field, $key); )*
                map
            }
        }
    };
}

macro_rules! bible_default {
    (tile_bool) => { TileMap::default() };
    (tile_int) => { TileMap::default() };
    (tile_tile) => { TileMap::default() };
    (tile_unit_builds) => { TileMap::default() };
    (tile_tile_builds) => { TileMap::default() };
    (unit_bool) => { UnitMap::default() };
    (unit_int) => { UnitMap::default() };
    (unit_tile_builds) => { UnitMap::default() };
    (season_int) => { SeasonMap::default() };
    (season_int, $default:expr) => { SeasonMap::uniform($default) };
    (int) => { 0 };
    (int, $default:expr) => { $default };
    (bool) => { false };
    (bool, $default:expr) => { $default };
}

macro_rules! bible_scalar_default {
    () => {
        Default::default()
    };
    ($default:expr) => {
        $default
    };
}

bible_table! {
    // --- tile properties ---------------------------------------------------
    tile_bool tile_accessible : "tileAccessible";
    tile_bool tile_walkable : "tileWalkable";
    tile_bool tile_buildable : "tileBuildable";
    tile_bool tile_destructible : "tileDestructible";
    tile_bool tile_grassy : "tileGrassy";
    tile_bool tile_natural : "tileNatural";
    tile_bool tile_laboring : "tileLaboring";
    tile_bool tile_energizing : "tileEnergizing";
    tile_bool tile_powered : "tilePowered";
    tile_bool tile_ownable : "tileOwnable";
    tile_bool tile_controllable : "tileControllable";
    tile_bool tile_binding : "tileBinding", aliases ["tileVital"];
    tile_bool tile_autocultivates : "tileAutoCultivates";
    tile_bool tile_trenches : "tileTrenches";
    tile_bool tile_flammable : "tileFlammable";

    // --- tile numbers ------------------------------------------------------
    tile_int tile_stacks_built : "tileStacksBuilt";
    tile_int tile_stacks_max : "tileStacksMax", aliases ["tileStacks"];
    tile_int tile_power_built : "tilePowerBuilt";
    tile_int tile_power_max : "tilePowerMax", aliases ["tilePower"];
    tile_int tile_vision : "tileVision";
    tile_int tile_hitpoints : "tileHitpoints";
    tile_int tile_income : "tileIncome";
    tile_int tile_leak_gas : "tileLeakGas";
    tile_int tile_leak_rads : "tileLeakRads";
    tile_int tile_emit_chaos : "tileEmitChaos", aliases ["tileEmission"];
    tile_int tile_score : "tileScoreBase", aliases ["tileScore"];
    tile_int tile_cost : "tileCost";
    tile_int tile_expand_range_min : "tileExpandRangeMin";
    tile_int tile_expand_range_max : "tileExpandRangeMax";
    tile_int tile_produce_range_min : "tileProduceRangeMin";
    tile_int tile_produce_range_max : "tileProduceRangeMax";

    // --- tile transforms ---------------------------------------------------
    tile_tile tile_destroyed_into : "tileDestroyed";
    tile_tile tile_degraded_into : "tileDegraded";
    tile_tile tile_desertified_into : "tileDesertified";
    tile_tile tile_consumed_into : "tileConsumed";
    tile_tile tile_regrown_into : "tileRegrown";

    // --- tile build lists --------------------------------------------------
    tile_unit_builds tile_produces : "tileProduces";
    tile_tile_builds tile_expands : "tileExpands";
    tile_tile_builds tile_upgrades : "tileUpgrades";
    tile_tile_builds tile_cultivates : "tileCultivates";

    // --- unit properties ---------------------------------------------------
    unit_bool unit_air : "unitAir";
    unit_bool unit_infantry : "unitInfantry";
    unit_bool unit_mechanical : "unitMechanical";
    unit_bool unit_can_move : "unitCanMove";
    unit_bool unit_can_attack : "unitCanAttack";
    unit_bool unit_can_focus : "unitCanFocus";
    unit_bool unit_can_lockdown : "unitCanLockdown";
    unit_bool unit_can_shell : "unitCanShell";
    unit_bool unit_can_bombard : "unitCanBombard";
    unit_bool unit_can_bomb : "unitCanBomb";
    unit_bool unit_can_capture : "unitCanCapture";
    unit_bool unit_can_occupy : "unitCanOccupy";
    unit_bool unit_can_shape : "unitCanShape";
    unit_bool unit_can_settle : "unitCanSettle";

    // --- unit numbers ------------------------------------------------------
    unit_int unit_stacks_max : "unitStacksMax", aliases ["unitStacks"];
    unit_int unit_speed : "unitSpeed";
    unit_int unit_vision : "unitVision";
    unit_int unit_hitpoints : "unitHitpoints";
    unit_int unit_attack_shots : "unitAttackShots";
    unit_int unit_attack_damage : "unitAttackDamage";
    unit_int unit_trample_shots : "unitTrampleShots";
    unit_int unit_trample_damage : "unitTrampleDamage";
    unit_int unit_ability_shots : "unitAbilityShots";
    unit_int unit_ability_damage : "unitAbilityDamage";
    unit_int unit_ability_volleys : "unitAbilityVolleys";
    unit_int unit_ability_gas : "unitAbilityGas";
    unit_int unit_ability_rads : "unitAbilityRads";
    unit_int unit_ability_radius : "unitAbilityRadius";
    unit_int unit_range_min : "unitRangeMin";
    unit_int unit_range_max : "unitRangeMax";
    unit_int unit_leak_gas : "unitLeakGas";
    unit_int unit_leak_rads : "unitLeakRads";
    unit_int unit_cost : "unitCost";

    // --- unit build lists --------------------------------------------------
    unit_tile_builds unit_shapes : "unitShapes";
    unit_tile_builds unit_settles : "unitSettles";

    // --- weather and season tables -----------------------------------------
    season_int season_temperature_min : "seasonTemperatureMin", aliases ["temperatureMin"];
    season_int season_temperature_max : "seasonTemperatureMax", aliases ["temperatureMax"], default 25;
    season_int season_humidity_min : "seasonHumidityMin", aliases ["humidityMin"];
    season_int season_humidity_max : "seasonHumidityMax", aliases ["humidityMax"], default 4;
    season_int season_chaos_threshold : "seasonChaosThreshold", aliases ["chaosThreshold"], default 25;

    int snow_humidity_min : "snowHumidityMin", default 1;
    int snow_temperature_max : "snowTemperatureMax", default 0;
    int frostbite_temperature_max : "frostbiteTemperatureMax", default -5;
    int firestorm_temperature_min : "firestormTemperatureMin", default 40;
    int firestorm_humidity_max : "firestormHumidityMax", default 0;
    int bonedrought_humidity_max : "bonedroughtHumidityMax", default 0;
    int death_humidity_max : "deathHumidityMax", default 0;
    int death_temperature_min : "deathTemperatureMin", default 50;

    // --- hazard and pollution constants ------------------------------------
    int emission_divisor : "emissionDivisor", default 1;
    int gas_pollution_amount : "gasPollutionAmount", default 1;
    int radiation_pollution_amount : "radiationPollutionAmount", default 1;
    int aridification_amount : "aridificationAmount", default 1;
    int aridification_count : "aridificationCount", default 4;
    int firestorm_count : "firestormCount", default 4;
    int death_count : "deathCount", default 2;
    int forest_growth_probability_divisor : "forestGrowthProbabilityDivisor", default 10;
    int grass_regrowth_probability_divisor : "grassRegrowthProbabilityDivisor", default 3;
    int crops_regrowth_probability_divisor : "cropsRegrowthProbabilityDivisor", default 2;
    int frostbite_shots : "frostbiteShots", default 1;
    int frostbite_damage : "frostbiteDamage", default 1;
    int firestorm_shots : "firestormShots", default 3;
    int firestorm_damage : "firestormDamage", default 2;
    int gas_shots : "gasShots", default 3;
    int gas_damage : "gasDamage", default 1;
    int radiation_shots : "radiationShots", default 3;
    int radiation_damage : "radiationDamage", default 1;

    // --- combat constants --------------------------------------------------
    int miss_count_ground : "missCountGround";
    int miss_count_trenches : "missCountTrenches", aliases ["trenchesMissCount"], default 3;
    int miss_hitpoints_ground : "missHitpointsGround", default 1;
    int miss_hitpoints_trenches : "missHitpointsTrenches", aliases ["trenchesMissHitpoints"], default 1;

    // --- economy and behavior ----------------------------------------------
    int new_order_limit : "newOrderLimit", aliases ["orderLimit"], default 5;
    int starting_money : "startingMoney", default 20;
    int max_money : "maxMoney", default 500;
    int min_money : "minMoney";
    int snow_slow_amount : "snowSlowAmount", default 1;
    int snow_slow_maximum : "snowSlowMaximum", default 1;
    int power_niceness_range_sq : "powerNicenessRangeSq", default 2;

    bool capture_strength_check : "captureStrengthCheck";
    bool trenches_force_occupy : "trenchesForceOccupy";
    bool trenches_hide_bypassed_unit : "trenchesHideBypassedUnit", default true;
    bool public_initiative : "publicInitiative", default true;
    bool quantitative_chaos : "quantitativeChaos", default true;
    bool counter_based_weather : "counterBasedWeather";
    bool randomized_firestorm : "randomizedFirestorm", default true;
    bool randomized_aridification : "randomizedAridification", default true;
    bool randomized_death : "randomizedDeath";
    bool cumulative_death : "cumulativeDeath", default true;
    bool grass_only_regrows_in_spring : "grassOnlyRegrowsInSpring", default true;
    bool trees_only_grow_in_spring : "treesOnlyGrowInSpring", default true;
    bool crops_only_grow_in_spring : "cropsOnlyGrowInSpring";
    bool ground_pollution_only_in_autumn : "groundPollutionOnlyInAutumn", default true;
    bool markers_change_at_night : "markersChangeAtNight", default true;
    bool weather_after_night : "weatherAfterNight", default true;
    bool gas_only_targets_ground_units : "gasOnlyTargetsGroundUnits", default true;
    bool frostbite_only_targets_ground_units : "frostbiteOnlyTargetsGroundUnits", default true;
    bool stack_based_frostbite : "stackBasedFrostbite";
    bool cold_feet_in_spring : "coldFeetInSpring", default true;
    bool bypass_exempt_from_lockdown : "bypassExemptFromLockdown", default true;
}

impl Bible {
    /// Load a ruleset from its JSON document.
    ///
    /// Missing keys fall back through historical aliases and then type
    /// defaults; unknown type words resolve to the absent type. Unparsable
    /// season words raise.
    pub fn from_json(value: &Value) -> Result<Self, ParseError> {
        let empty = Map::new();
        let json = value.as_object().unwrap_or(&empty);
        let mut bible = Bible::empty();

        if let Some(v) = json.get("version").and_then(Value::as_str) {
            bible.version = v.parse()?;
        }

        // The type lists come first: every later field parses type words
        // against these registries.
        if let Some(Value::Array(names)) = lookup(json, &["tiletypes", "tileTypes"]) {
            for name in names {
                if let Some(word) = name.as_str() {
                    bible.tile_registry.insert(word);
                }
            }
        }
        if let Some(Value::Array(names)) = lookup(json, &["unittypes", "unitTypes"]) {
            for name in names {
                if let Some(word) = name.as_str() {
                    bible.unit_registry.insert(word);
                }
            }
        }

        bible.fill(json)?;

        // Compatibility rules a key alias cannot express: the pre-1.0
        // "snowSlow" scalar set both the amount and the cap.
        if !json.contains_key("snowSlowAmount") && !json.contains_key("snowSlowMaximum") {
            if let Some(v) = json.get("snowSlow").and_then(Value::as_i64) {
                bible.snow_slow_amount = v as i32;
                bible.snow_slow_maximum = v as i32;
            }
        }

        bible.finalize();
        Ok(bible)
    }

    /// Serialize back to JSON. Lossless with respect to `from_json`:
    /// `Bible::from_json(&bible.to_json()) == bible`.
    pub fn to_json(&self) -> Value {
        Value::Object(self.save())
    }

    /// Resolve build-cost placeholders and check bounds. Called by
    /// `from_json`; separate so hand-built test rulesets can share it.
    pub fn finalize(&mut self) {
        debug_assert!(self.tile_registry.len() <= TILE_TYPE_MAX);
        debug_assert!(self.unit_registry.len() <= UNIT_TYPE_MAX);
        // A build entry with no explicit cost inherits the built type's
        // base cost.
        let unit_costs = self.unit_cost.clone();
        let tile_costs = self.tile_cost.clone();
        for values in [&mut self.tile_expands, &mut self.tile_upgrades, &mut self.tile_cultivates]
        {
            for code in 0..TILE_TYPE_MAX {
                for build in &mut values.values[code] {
                    if build.cost.is_none() {
                        build.cost = Some(tile_costs[build.tile]);
                    }
                }
            }
        }
        for code in 0..TILE_TYPE_MAX {
            for build in &mut self.tile_produces.values[code] {
                if build.cost.is_none() {
                    build.cost = Some(unit_costs[build.unit]);
                }
            }
        }
        for values in [&mut self.unit_shapes, &mut self.unit_settles] {
            for code in 0..UNIT_TYPE_MAX {
                for build in &mut values.values[code] {
                    if build.cost.is_none() {
                        build.cost = Some(tile_costs[build.tile]);
                    }
                }
            }
        }
    }

    /// The tile type for a ruleset word, or the absent type.
    pub fn tile_type(&self, word: &str) -> TileType {
        TileType(self.tile_registry.code(word).unwrap_or(0))
    }

    /// The unit type for a ruleset word, or the absent type.
    pub fn unit_type(&self, word: &str) -> UnitType {
        UnitType(self.unit_registry.code(word).unwrap_or(0))
    }

    pub fn tile_name(&self, typ: TileType) -> &str {
        self.tile_registry.name(typ.0)
    }

    pub fn unit_name(&self, typ: UnitType) -> &str {
        self.unit_registry.name(typ.0)
    }

    pub fn tile_count(&self) -> usize {
        self.tile_registry.len()
    }

    pub fn unit_count(&self) -> usize {
        self.unit_registry.len()
    }

    /// The ruleset this engine ships with.
    pub fn current() -> Self {
        Bible::from_json(&builtin_ruleset()).expect("built-in ruleset must parse")
    }
}

/// The shipped ruleset document. Kept as data so the loader is exercised on
/// every match start and the round-trip law holds for it by construction.
fn builtin_ruleset() -> Value {
    json!({
        "version": "1.0.0",
        "tiletypes": [
            "grass", "dirt", "desert", "rubble", "ridge", "trees", "crops",
            "soil", "city", "town", "farm", "industry", "barracks",
            "airfield", "trenches",
        ],
        "unittypes": [
            "rifleman", "gunner", "sapper", "tank", "settler", "militia",
            "zeppelin",
        ],
        "tileAccessible": [
            "grass", "dirt", "desert", "rubble", "trees", "crops", "soil",
            "city", "town", "farm", "industry", "barracks", "airfield",
            "trenches",
        ],
        "tileWalkable": [
            "grass", "dirt", "desert", "rubble", "trees", "crops", "soil",
            "city", "town", "farm", "industry", "barracks", "airfield",
            "trenches",
        ],
        "tileBuildable": ["grass", "dirt", "desert", "soil"],
        "tileDestructible": [
            "trees", "crops", "soil", "city", "town", "farm", "industry",
            "barracks", "airfield", "trenches",
        ],
        "tileGrassy": ["grass", "trees", "crops", "soil"],
        "tileNatural": ["grass", "dirt", "desert", "ridge", "trees"],
        "tileLaboring": ["city", "town", "farm"],
        "tileEnergizing": ["industry"],
        "tilePowered": ["city", "town", "industry", "barracks", "airfield"],
        "tileOwnable": [
            "city", "town", "farm", "industry", "barracks", "airfield",
            "trenches", "soil", "crops",
        ],
        "tileControllable": [
            "city", "town", "farm", "industry", "barracks", "airfield",
        ],
        "tileBinding": ["city"],
        "tileAutoCultivates": ["farm"],
        "tileTrenches": ["trenches"],
        "tileFlammable": ["trees", "crops"],
        "tileStacksBuilt": {
            "trees": 1, "crops": 1, "city": 1, "town": 1, "farm": 1,
            "industry": 1, "barracks": 1, "airfield": 1,
        },
        "tileStacksMax": {
            "trees": 5, "crops": 1, "city": 5, "town": 3, "farm": 2,
            "industry": 3, "barracks": 3, "airfield": 2,
        },
        "tilePowerBuilt": {
            "city": 1, "town": 1, "industry": 1, "barracks": 1, "airfield": 1,
        },
        "tilePowerMax": {
            "city": 5, "town": 2, "industry": 3, "barracks": 3, "airfield": 2,
        },
        "tileVision": {
            "city": 2, "town": 2, "farm": 2, "industry": 2, "barracks": 2,
            "airfield": 2, "trenches": 1,
        },
        "tileHitpoints": {
            "trees": 1, "crops": 1, "soil": 1, "city": 2, "town": 2,
            "farm": 2, "industry": 3, "barracks": 2, "airfield": 2,
            "trenches": 1,
        },
        "tileIncome": { "city": 1, "town": 1, "farm": 1 },
        "tileLeakGas": { "industry": 1 },
        "tileLeakRads": {},
        "tileEmitChaos": { "industry": 2, "barracks": 1, "airfield": 1 },
        "tileScoreBase": {
            "grass": 1, "trees": 2, "crops": 1, "city": 10, "town": 5,
            "farm": 2, "industry": 2, "barracks": 1, "airfield": 1,
        },
        "tileCost": {
            "city": 50, "town": 25, "farm": 10, "industry": 25,
            "barracks": 25, "airfield": 25, "trenches": 5, "soil": 5,
            "crops": 5,
        },
        "tileExpandRangeMin": {
            "city": 1, "town": 1, "farm": 1, "industry": 1, "barracks": 1,
        },
        "tileExpandRangeMax": {
            "city": 2, "town": 2, "farm": 2, "industry": 2, "barracks": 2,
        },
        "tileProduceRangeMin": { "city": 0, "town": 0, "barracks": 0, "airfield": 0 },
        "tileProduceRangeMax": { "city": 1, "town": 1, "barracks": 1, "airfield": 1 },
        "tileDestroyed": {
            "trees": "dirt", "crops": "dirt", "soil": "dirt",
            "city": "rubble", "town": "rubble", "farm": "rubble",
            "industry": "rubble", "barracks": "rubble",
            "airfield": "rubble", "trenches": "dirt",
        },
        "tileDegraded": {
            "grass": "dirt", "crops": "soil", "trees": "grass",
        },
        "tileDesertified": { "dirt": "desert", "grass": "dirt" },
        "tileConsumed": {
            "trees": "dirt", "crops": "dirt", "grass": "dirt",
        },
        "tileRegrown": { "grass": "trees", "dirt": "grass", "soil": "crops" },
        "tileProduces": {
            "city": [{"type": "settler"}, {"type": "militia", "cost": 5}],
            "town": [{"type": "settler"}, {"type": "militia", "cost": 5}],
            "barracks": [
                {"type": "rifleman"}, {"type": "gunner"}, {"type": "sapper"},
                {"type": "tank"},
            ],
            "airfield": [{"type": "zeppelin"}],
        },
        "tileExpands": {
            "city": [{"type": "town"}, {"type": "barracks"}, {"type": "airfield"}],
            "town": [{"type": "farm"}, {"type": "industry"}],
            "farm": [{"type": "soil"}],
        },
        "tileUpgrades": {
            "town": [{"type": "city"}],
            "farm": [{"type": "town"}],
        },
        "tileCultivates": {
            "farm": [{"type": "soil", "cost": 2}],
        },
        "unitAir": ["zeppelin"],
        "unitInfantry": ["rifleman", "gunner", "sapper", "militia"],
        "unitMechanical": ["tank", "zeppelin"],
        "unitCanMove": [
            "rifleman", "gunner", "sapper", "tank", "settler", "militia",
            "zeppelin",
        ],
        "unitCanAttack": ["rifleman", "gunner", "tank", "militia"],
        "unitCanFocus": ["rifleman", "gunner", "militia"],
        "unitCanLockdown": ["gunner", "tank"],
        "unitCanShell": ["tank"],
        "unitCanBombard": ["sapper"],
        "unitCanBomb": ["zeppelin"],
        "unitCanCapture": ["rifleman", "militia"],
        "unitCanOccupy": ["rifleman", "gunner", "militia"],
        "unitCanShape": ["sapper"],
        "unitCanSettle": ["settler"],
        "unitStacksMax": {
            "rifleman": 3, "gunner": 3, "sapper": 2, "tank": 3,
            "settler": 1, "militia": 5, "zeppelin": 1,
        },
        "unitSpeed": {
            "rifleman": 3, "gunner": 2, "sapper": 2, "tank": 3,
            "settler": 3, "militia": 2, "zeppelin": 1,
        },
        "unitVision": {
            "rifleman": 4, "gunner": 4, "sapper": 2, "tank": 2,
            "settler": 2, "militia": 2, "zeppelin": 20,
        },
        "unitHitpoints": {
            "rifleman": 2, "gunner": 2, "sapper": 1, "tank": 3,
            "settler": 1, "militia": 1, "zeppelin": 3,
        },
        "unitAttackShots": {
            "rifleman": 1, "gunner": 3, "tank": 1, "militia": 1,
        },
        "unitAttackDamage": {
            "rifleman": 1, "gunner": 1, "tank": 3, "militia": 1,
        },
        "unitTrampleShots": { "tank": 1 },
        "unitTrampleDamage": { "tank": 1 },
        "unitAbilityShots": { "tank": 1, "sapper": 1, "zeppelin": 0 },
        "unitAbilityDamage": { "tank": 3, "sapper": 2, "zeppelin": 0 },
        "unitAbilityVolleys": { "tank": 1, "sapper": 3, "zeppelin": 1 },
        "unitAbilityGas": { "zeppelin": 2 },
        "unitAbilityRads": {},
        "unitAbilityRadius": { "zeppelin": 2 },
        "unitRangeMin": { "tank": 2, "sapper": 2, "zeppelin": 0 },
        "unitRangeMax": { "tank": 8, "sapper": 13, "zeppelin": 0 },
        "unitLeakGas": {},
        "unitLeakRads": {},
        "unitCost": {
            "rifleman": 10, "gunner": 20, "sapper": 15, "tank": 30,
            "settler": 1, "militia": 5, "zeppelin": 20,
        },
        "unitShapes": {
            "sapper": [{"type": "trenches"}],
        },
        "unitSettles": {
            "settler": [{"type": "city"}, {"type": "farm", "cost": 10}],
        },
        "seasonTemperatureMin": {
            "spring": 5, "summer": 15, "autumn": 5, "winter": -10,
        },
        "seasonTemperatureMax": {
            "spring": 20, "summer": 35, "autumn": 20, "winter": 10,
        },
        "seasonHumidityMin": {
            "spring": 1, "summer": 0, "autumn": 1, "winter": 1,
        },
        "seasonHumidityMax": {
            "spring": 4, "summer": 3, "autumn": 4, "winter": 4,
        },
        "seasonChaosThreshold": {
            "spring": 25, "summer": 25, "autumn": 25, "winter": 25,
        },
        "missCountGround": 0,
        "missCountTrenches": 3,
        "missHitpointsGround": 1,
        "missHitpointsTrenches": 1,
        "newOrderLimit": 5,
        "startingMoney": 20,
        "maxMoney": 500,
        "minMoney": 0,
        "snowSlowAmount": 1,
        "snowSlowMaximum": 1,
        "captureStrengthCheck": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ruleset_parses_and_is_finalized() {
        let bible = Bible::current();
        assert!(bible.tile_count() > 10);
        assert!(bible.unit_count() > 5);
        // Build costs were resolved: rifleman production inherits the
        // unit's base cost, militia keeps its override.
        let barracks = bible.tile_type("barracks");
        let rifleman = bible.unit_type("rifleman");
        let produces = &bible.tile_produces[barracks];
        let entry = produces.iter().find(|b| b.unit == rifleman).unwrap();
        assert_eq!(entry.cost(), bible.unit_cost[rifleman]);
        let city = bible.tile_type("city");
        let militia = bible.unit_type("militia");
        let militia_entry = bible.tile_produces[city]
            .iter()
            .find(|b| b.unit == militia)
            .unwrap();
        assert_eq!(militia_entry.cost(), 5);
    }

    #[test]
    fn roundtrip_law() {
        let bible = Bible::current();
        let json = bible.to_json();
        let reloaded = Bible::from_json(&json).unwrap();
        assert_eq!(bible, reloaded);
    }

    #[test]
    fn unknown_type_words_resolve_to_absent() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": ["grass"],
            "unittypes": ["rifleman"],
            "tileWalkable": ["grass", "palace"],
            "tileDegraded": { "grass": "palace" },
        }))
        .unwrap();
        let grass = bible.tile_type("grass");
        assert!(bible.tile_walkable[grass]);
        assert!(bible.tile_type("palace").is_none());
        assert!(bible.tile_degraded_into[grass].is_none());
    }

    #[test]
    fn alias_fallback_applies_when_new_key_absent() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "orderLimit": 3,
        }))
        .unwrap();
        assert_eq!(bible.new_order_limit, 3);

        // The new-style key wins over the alias.
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "newOrderLimit": 7,
            "orderLimit": 3,
        }))
        .unwrap();
        assert_eq!(bible.new_order_limit, 7);
    }

    #[test]
    fn legacy_snow_slow_scalar_sets_both_fields() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "snowSlow": 2,
        }))
        .unwrap();
        assert_eq!(bible.snow_slow_amount, 2);
        assert_eq!(bible.snow_slow_maximum, 2);
    }

    #[test]
    fn season_scalar_applies_to_all_seasons() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "seasonTemperatureMax": 30,
        }))
        .unwrap();
        for season in Season::ALL {
            assert_eq!(bible.season_temperature_max[season], 30);
        }
    }

    #[test]
    fn season_map_fills_named_entries() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "seasonTemperatureMax": { "winter": -2, "summer": 38 },
        }))
        .unwrap();
        assert_eq!(bible.season_temperature_max[Season::Winter], -2);
        assert_eq!(bible.season_temperature_max[Season::Summer], 38);
        // Unnamed seasons keep the field default.
        assert_eq!(bible.season_temperature_max[Season::Spring], 25);
    }

    #[test]
    fn unknown_season_word_raises() {
        let result = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": [],
            "unittypes": [],
            "seasonTemperatureMax": { "monsoon": 30 },
        }));
        assert!(matches!(result, Err(ParseError::UnknownSeason(_))));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let bible = Bible::from_json(&json!({
            "version": "1.0.0",
            "tiletypes": ["grass"],
            "unittypes": [],
        }))
        .unwrap();
        assert_eq!(bible.new_order_limit, 5);
        assert_eq!(bible.starting_money, 20);
        assert!(!bible.capture_strength_check);
        let grass = bible.tile_type("grass");
        assert_eq!(bible.tile_income[grass], 0);
        assert!(!bible.tile_walkable[grass]);
    }

    #[test]
    fn equality_detects_a_single_field_difference() {
        let a = Bible::current();
        let mut b = Bible::current();
        assert_eq!(a, b);
        b.new_order_limit += 1;
        assert_ne!(a, b);
    }

    #[test]
    fn version_roundtrips() {
        let bible = Bible::current();
        let json = bible.to_json();
        assert_eq!(json["version"], json!("1.0.0"));
    }
}
