// Match recordings.
//
// A recording is an append-only text log, one JSON value per line. Line 1
// is the match metadata: players, the engine version that produced it, the
// RNG seed, the map name, the full ruleset document, and an optional
// challenge id. Every later line is one changeset, exactly as `act()`
// returned it, serialized as an array of `{"change":…,"vision":…}`
// objects.
//
// The reader tolerates the pre-historic format where line 1 is itself a
// bare changeset array with no metadata object. It refuses, at open time,
// any recording made by a newer engine than the one running — version
// skew is reported loudly instead of silently degrading a replay.

use crate::change::ChangeSet;
use crate::error::LoadError;
use crate::player::Player;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::error;

/// The first line of a recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default = "Version::current")]
    pub version: Version,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub map: String,
    /// The full ruleset document, for the "replay ruleset equals local
    /// ruleset" check at replay open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bible: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            version: Version::current(),
            seed: 0,
            map: String::new(),
            bible: None,
            challenge: None,
        }
    }
}

/// A whole recording held in memory: metadata plus every changeset in
/// order. The automaton appends to this after every `act()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    pub metadata: Metadata,
    pub sets: Vec<ChangeSet>,
}

impl Recording {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            sets: Vec::new(),
        }
    }

    /// Append one changeset.
    pub fn record(&mut self, set: &ChangeSet) {
        self.sets.push(set.clone());
    }

    /// Serialize to the line format: metadata, then one line per set.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        out.push_str(&serde_json::to_string(&self.metadata).expect("metadata serializes"));
        out.push('\n');
        for set in &self.sets {
            out.push_str(&serde_json::to_string(set).expect("changeset serializes"));
            out.push('\n');
        }
        out
    }

    /// Parse the line format, tolerating the pre-historic bare-array first
    /// line. Refuses recordings made by a newer engine.
    pub fn from_lines(text: &str) -> Result<Recording, LoadError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let first = lines.next().ok_or(LoadError::EmptyRecording)?;
        let value: Value = serde_json::from_str(first).map_err(|source| LoadError::Json {
            path: "<recording>".to_string(),
            source,
        })?;

        let mut recording = Recording::default();
        if value.is_array() {
            // Pre-historic format: no metadata object, line 1 is already a
            // changeset.
            let set: ChangeSet =
                serde_json::from_value(value).map_err(|source| LoadError::Json {
                    path: "<recording>".to_string(),
                    source,
                })?;
            recording.sets.push(set);
        } else {
            recording.metadata =
                serde_json::from_value(value).map_err(|source| LoadError::Json {
                    path: "<recording>".to_string(),
                    source,
                })?;
        }

        let running = Version::current();
        if recording.metadata.version > running {
            return Err(LoadError::NewerVersion {
                recorded: recording.metadata.version,
                running,
            });
        }

        for line in lines {
            let set: ChangeSet =
                serde_json::from_str(line).map_err(|source| LoadError::Json {
                    path: "<recording>".to_string(),
                    source,
                })?;
            recording.sets.push(set);
        }
        Ok(recording)
    }

    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let shown = path.display().to_string();
        std::fs::write(path, self.to_lines()).map_err(|source| {
            error!(path = %shown, %source, "recording unwritable");
            LoadError::Io {
                path: shown.clone(),
                source,
            }
        })
    }

    pub fn load(path: &Path) -> Result<Recording, LoadError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| {
            error!(path = %shown, %source, "recording unreadable");
            LoadError::Io {
                path: shown.clone(),
                source,
            }
        })?;
        Self::from_lines(&text)
    }
}

/// Streaming append-only writer: metadata on creation, then one line per
/// recorded changeset, flushed as it goes so a crash loses at most the
/// line being written.
pub struct RecordingWriter {
    file: BufWriter<File>,
}

impl RecordingWriter {
    pub fn create(path: &Path, metadata: &Metadata) -> Result<Self, LoadError> {
        let shown = path.display().to_string();
        let file = File::create(path).map_err(|source| {
            error!(path = %shown, %source, "recording uncreatable");
            LoadError::Io {
                path: shown.clone(),
                source,
            }
        })?;
        let mut writer = Self {
            file: BufWriter::new(file),
        };
        writer.line(&serde_json::to_string(metadata).expect("metadata serializes"), &shown)?;
        Ok(writer)
    }

    pub fn record(&mut self, set: &ChangeSet) -> Result<(), LoadError> {
        self.line(
            &serde_json::to_string(set).expect("changeset serializes"),
            "<recording>",
        )
    }

    fn line(&mut self, text: &str, shown: &str) -> Result<(), LoadError> {
        let write = |file: &mut BufWriter<File>| {
            file.write_all(text.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()
        };
        write(&mut self.file).map_err(|source| LoadError::Io {
            path: shown.to_string(),
            source,
        })
    }
}
