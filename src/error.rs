//! Failure taxonomy for a reset run
//!
//! Every error is fatal and terminal: nothing is retried internally. Each
//! variant maps to the pipeline stage that produced it so the caller can tell
//! which step failed.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage reported in failure diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Platform,
    Backup,
    Load,
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Platform => "platform",
            Stage::Backup => "backup",
            Stage::Load => "load",
            Stage::Save => "save",
        })
    }
}

#[derive(Debug, Error)]
pub enum ResetError {
    /// No storage path can be resolved for the running system
    #[error("unsupported platform: {detail}")]
    UnsupportedPlatform { detail: String },

    /// The pre-mutation snapshot could not be written
    #[error("failed to back up {path}: {source}")]
    BackupWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An existing storage file could not be read
    #[error("failed to read {path}: {source}")]
    ConfigReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An existing, non-empty storage file is not valid JSON
    #[error("malformed JSON in {path}: {source}")]
    ConfigParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The storage file parsed, but its top level is not an object
    #[error("expected a JSON object in {path}, found {found}")]
    ConfigNotObject { path: PathBuf, found: &'static str },

    /// The replacement storage file could not be written
    #[error("failed to write {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The plain-text machine id file could not be replaced
    #[error("failed to write machine id file {path}: {source}")]
    MachineIdWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The state database update was rolled back
    #[error("failed to update state database {path}: {source}")]
    StateDbFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl ResetError {
    pub fn stage(&self) -> Stage {
        match self {
            ResetError::UnsupportedPlatform { .. } => Stage::Platform,
            ResetError::BackupWriteFailed { .. } => Stage::Backup,
            ResetError::ConfigReadFailed { .. }
            | ResetError::ConfigParseFailed { .. }
            | ResetError::ConfigNotObject { .. } => Stage::Load,
            ResetError::ConfigWriteFailed { .. }
            | ResetError::MachineIdWriteFailed { .. }
            | ResetError::StateDbFailed { .. } => Stage::Save,
        }
    }
}
