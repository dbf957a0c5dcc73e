//! Error types
//!
//! Map I/O failures are reported and leave the world untouched, malformed
//! portal lines are skipped one at a time, and lifecycle ordering bugs abort.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain the text of a level's map
#[derive(Debug, Error)]
pub enum MapError {
    /// The map file could not be opened or read
    #[error("unable to read map file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An in-memory source has no map for this level
    #[error("no map registered for level {level}")]
    Missing { level: u32 },
}

/// Reason a single `Portals Links:` line was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkLineError {
    #[error("expected `label|x,y,level|x,y,level`, found {found} `|` separated groups")]
    GroupCount { found: usize },
    #[error("endpoint `{endpoint}` must have three comma separated fields")]
    MissingFields { endpoint: String },
    #[error("endpoint field `{field}` is not an integer")]
    InvalidNumber { field: String },
    #[error("endpoint level `{level}` must be at least 1")]
    InvalidLevel { level: i64 },
}

/// Failure to load a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unable to read settings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Parsed fine but the value cannot drive the simulation
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Physics invariant violations. These indicate a lifecycle ordering bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("player body is missing from the physics world")]
    PlayerBodyMissing,
}
