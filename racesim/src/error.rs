//! Error types of the race weekend simulator.
//!
//! Configuration problems (missing or malformed reference, result and progress files) and
//! synchronization failures are fatal for a run. Malformed lines are rejected with their
//! location instead of being skipped.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Synchronization primitive '{0}' is poisoned, shared session state can no longer be trusted")]
    Gate(&'static str),

    #[error("{}:{line}: {reason}", .file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid session parameter: {0}")]
    InvalidParameter(String),

    #[error("Pilot {0} is not part of the driver directory")]
    UnknownPilot(u32),

    #[error("Event {0} is not part of the track catalog")]
    UnknownEvent(usize),

    #[error("Phase '{0}' has no simulation to run")]
    NotRunnable(String),

    #[error("Championship is over after {0} events")]
    ChampionshipOver(usize),

    #[error("{0} panicked")]
    WorkerPanicked(String),
}

impl SimError {
    pub fn parse(file: &Path, line: usize, reason: impl Into<String>) -> Self {
        SimError::Parse {
            file: file.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    /// from_csv converts a csv reader error into a parse error pointing at the offending line.
    pub fn from_csv(file: &Path, err: &csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line() as usize).unwrap_or(0);
        SimError::parse(file, line, err.to_string())
    }
}
