// Bidirectional type-name table.
//
// Rulesets refer to tile and unit types by human-readable words ("grass",
// "rifleman"); the board and every hot loop refer to them by small integer
// codes. A `TypeRegistry` owns that mapping in both directions, bounded by
// a fixed maximum so per-type ruleset tables can be plain arrays.
//
// Code 0 is reserved for the absent type and always maps to the word
// "none". Unknown words resolve to code 0 at the ruleset boundary rather
// than erroring — old rulesets may name types this build no longer ships.
//
// The name→code map is lookup-only and never iterated, so `FxHashMap` is
// safe here; iteration always goes through the code-ordered `names` vector.

use rustc_hash::FxHashMap;
use tracing::error;

/// Upper bound on distinct tile types, including the absent type.
pub const TILE_TYPE_MAX: usize = 32;

/// Upper bound on distinct unit types, including the absent type.
pub const UNIT_TYPE_MAX: usize = 32;

/// Bidirectional name↔code table, bounded by `capacity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRegistry {
    kind: &'static str,
    capacity: usize,
    names: Vec<String>,
    codes: FxHashMap<String, u8>,
}

impl TypeRegistry {
    /// An empty registry holding only the reserved absent type.
    pub fn new(kind: &'static str, capacity: usize) -> Self {
        let mut codes = FxHashMap::default();
        codes.insert("none".to_string(), 0u8);
        Self {
            kind,
            capacity,
            names: vec!["none".to_string()],
            codes,
        }
    }

    /// Register `name`, returning its code. Re-registering an existing name
    /// returns the already-assigned code. A registry past its capacity is a
    /// ruleset authoring error: fatal in debug builds, logged and collapsed
    /// to the absent type in release.
    pub fn insert(&mut self, name: &str) -> u8 {
        if let Some(&code) = self.codes.get(name) {
            return code;
        }
        if self.names.len() >= self.capacity {
            error!(
                kind = self.kind,
                capacity = self.capacity,
                name,
                "type registry overflow"
            );
            debug_assert!(false, "{} registry overflow at '{name}'", self.kind);
            return 0;
        }
        let code = self.names.len() as u8;
        self.names.push(name.to_string());
        self.codes.insert(name.to_string(), code);
        code
    }

    /// The code for `name`, or `None` if unregistered.
    pub fn code(&self, name: &str) -> Option<u8> {
        self.codes.get(name).copied()
    }

    /// The name for `code`. Out-of-range codes read as the absent type.
    pub fn name(&self, code: u8) -> &str {
        self.names
            .get(code as usize)
            .map(String::as_str)
            .unwrap_or("none")
    }

    /// Number of registered types, including the absent type.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        // The absent type is always present.
        false
    }

    /// All registered names in code order, skipping the absent type.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().skip(1).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_zero_is_reserved_for_none() {
        let reg = TypeRegistry::new("tile", TILE_TYPE_MAX);
        assert_eq!(reg.code("none"), Some(0));
        assert_eq!(reg.name(0), "none");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn insert_assigns_sequential_codes() {
        let mut reg = TypeRegistry::new("tile", TILE_TYPE_MAX);
        assert_eq!(reg.insert("grass"), 1);
        assert_eq!(reg.insert("forest"), 2);
        assert_eq!(reg.insert("city"), 3);
        assert_eq!(reg.code("forest"), Some(2));
        assert_eq!(reg.name(3), "city");
    }

    #[test]
    fn reinsert_returns_existing_code() {
        let mut reg = TypeRegistry::new("unit", UNIT_TYPE_MAX);
        let a = reg.insert("rifleman");
        let b = reg.insert("rifleman");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn unknown_name_is_none() {
        let reg = TypeRegistry::new("tile", TILE_TYPE_MAX);
        assert_eq!(reg.code("palace"), None);
    }

    #[test]
    fn out_of_range_code_reads_as_none() {
        let reg = TypeRegistry::new("tile", TILE_TYPE_MAX);
        assert_eq!(reg.name(200), "none");
    }

    #[test]
    fn names_iterates_in_code_order_without_none() {
        let mut reg = TypeRegistry::new("tile", TILE_TYPE_MAX);
        reg.insert("grass");
        reg.insert("dirt");
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["grass", "dirt"]);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn overflow_collapses_to_absent_type_in_release() {
        let mut reg = TypeRegistry::new("tile", 3);
        reg.insert("a");
        reg.insert("b");
        assert_eq!(reg.insert("c"), 0);
    }
}
