// Error types for the loading boundary.
//
// The engine distinguishes three failure classes. Malformed input data (bad
// ruleset JSON, a missing map or recording file) is fatal at load time and
// surfaces as `LoadError`. Unparsable enum words at the text boundary
// (season, phase, player names) surface as `ParseError`. Invalid player
// orders are NOT errors at all — they resolve into order dispositions with
// an optional private `Notice` (see `order.rs`), and broken engine
// invariants are debug assertions plus a `tracing::warn!` in release.

use thiserror::Error;

/// A word at the text-parsing boundary failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown player '{0}'")]
    UnknownPlayer(String),
    #[error("unknown season '{0}'")]
    UnknownSeason(String),
    #[error("unknown daytime '{0}'")]
    UnknownDaytime(String),
    #[error("unknown phase '{0}'")]
    UnknownPhase(String),
    #[error("unknown descriptor kind '{0}'")]
    UnknownDescriptor(String),
    #[error("malformed version '{0}'")]
    MalformedVersion(String),
}

/// A loader-level failure. Fatal: aborts the enclosing load operation.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("io error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("recording was made by version {recorded}, newer than this engine ({running})")]
    NewerVersion {
        recorded: crate::version::Version,
        running: crate::version::Version,
    },
    #[error("recording is empty")]
    EmptyRecording,
    #[error("recording ruleset does not match the installed ruleset")]
    RulesetMismatch,
    #[error("map '{0}' has no cells")]
    EmptyMap(String),
    #[error("map '{name}' declares {expected} cells but carries {actual}")]
    MapShape {
        name: String,
        expected: usize,
        actual: usize,
    },
}
