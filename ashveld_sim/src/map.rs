// Skirmish maps.
//
// A map is the immutable starting arrangement of a match: grid dimensions
// plus one entry per cell naming the tile, its owner, and optionally a
// starting unit. Tile and unit words are resolved against the bible at
// match setup, so a map referencing a retired type degrades to empty
// terrain instead of failing.
//
// Maps load from `maps/<name>.json`. A missing file or malformed document
// is fatal at load time — the loader logs and returns a `LoadError` rather
// than starting a match on partial data. One demo map ships in-crate so
// the engine and its tests run without any files on disk.

use crate::error::LoadError;
use crate::player::Player;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::error;

/// One cell of a map: the tile word, its owner, and an optional starting
/// unit (owned by the same player).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub tile: String,
    #[serde(default)]
    pub owner: Player,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MapCell {
    pub fn terrain(tile: &str) -> Self {
        Self {
            tile: tile.to_string(),
            owner: Player::None,
            unit: None,
        }
    }
}

/// The starting arrangement of a match, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    #[serde(skip)]
    pub name: String,
    pub rows: i16,
    pub cols: i16,
    pub cells: Vec<MapCell>,
}

impl Map {
    /// Load `maps/<name>.json`. The name "demo" resolves to the in-crate
    /// demo map without touching the filesystem.
    pub fn load(name: &str) -> Result<Map, LoadError> {
        if name == "demo" {
            return Ok(Map::demo());
        }
        let path = format!("maps/{name}.json");
        let mut map = Map::load_file(Path::new(&path))?;
        map.name = name.to_string();
        map.validate()?;
        Ok(map)
    }

    /// Load a map document from an explicit path. The caller names it.
    pub fn load_file(path: &Path) -> Result<Map, LoadError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| {
            error!(path = %shown, %source, "map file unreadable");
            LoadError::Io {
                path: shown.clone(),
                source,
            }
        })?;
        serde_json::from_str(&text).map_err(|source| {
            error!(path = %shown, %source, "map file malformed");
            LoadError::Json {
                path: shown.clone(),
                source,
            }
        })
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.rows <= 0 || self.cols <= 0 || self.cells.is_empty() {
            return Err(LoadError::EmptyMap(self.name.clone()));
        }
        let expected = self.rows as usize * self.cols as usize;
        if self.cells.len() != expected {
            return Err(LoadError::MapShape {
                name: self.name.clone(),
                expected,
                actual: self.cells.len(),
            });
        }
        Ok(())
    }

    /// The in-crate demo map: an 8×8 meadow with a city and a rifleman for
    /// red and blue each.
    pub fn demo() -> Map {
        let mut cells: Vec<MapCell> = (0..64).map(|_| MapCell::terrain("grass")).collect();
        let at = |row: usize, col: usize| row * 8 + col;
        cells[at(3, 3)] = MapCell::terrain("trees");
        cells[at(4, 4)] = MapCell::terrain("trees");
        cells[at(0, 7)] = MapCell::terrain("dirt");
        cells[at(7, 0)] = MapCell::terrain("dirt");
        cells[at(1, 1)] = MapCell {
            tile: "city".to_string(),
            owner: Player::Red,
            unit: None,
        };
        cells[at(1, 2)] = MapCell {
            tile: "grass".to_string(),
            owner: Player::Red,
            unit: Some("rifleman".to_string()),
        };
        cells[at(6, 6)] = MapCell {
            tile: "city".to_string(),
            owner: Player::Blue,
            unit: None,
        };
        cells[at(6, 5)] = MapCell {
            tile: "grass".to_string(),
            owner: Player::Blue,
            unit: Some("rifleman".to_string()),
        };
        Map {
            name: "demo".to_string(),
            rows: 8,
            cols: 8,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_map_is_well_formed() {
        let map = Map::demo();
        assert_eq!(map.name, "demo");
        assert_eq!(map.cells.len(), 64);
        assert!(map.validate().is_ok());
        // Both starting cities are present and owned.
        let cities: Vec<&MapCell> = map.cells.iter().filter(|c| c.tile == "city").collect();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].owner, Player::Red);
        assert_eq!(cities[1].owner, Player::Blue);
    }

    #[test]
    fn load_resolves_demo_without_files() {
        let map = Map::load("demo").unwrap();
        assert_eq!(map, Map::demo());
    }

    #[test]
    fn missing_map_file_is_fatal() {
        assert!(matches!(
            Map::load("no-such-map"),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut map = Map::demo();
        map.cells.pop();
        assert!(matches!(map.validate(), Err(LoadError::MapShape { .. })));
    }

    #[test]
    fn json_roundtrip() {
        let map = Map::demo();
        let text = serde_json::to_string(&map).unwrap();
        let mut back: Map = serde_json::from_str(&text).unwrap();
        back.name = "demo".to_string();
        assert_eq!(back, map);
    }

    #[test]
    fn loading_from_disk_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meadow.json");
        let map = Map::demo();
        std::fs::write(&path, serde_json::to_string(&map).unwrap()).unwrap();
        let loaded = Map::load_file(&path).unwrap();
        assert_eq!(loaded.cells, map.cells);
        assert_eq!(loaded.rows, 8);
    }
}
