//! Pipeline states, responses and errors.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::race::{RaceError, TaskError};
use crate::sources::Quote;

/// Lifecycle of one pipeline invocation.
///
/// ```text
/// Started → Racing → RaceWon → Persisting → Done
///                  │         └────────────→ Done   (no store)
///                  └→ RaceLost → Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Started,
    Racing,
    RaceWon,
    RaceLost,
    Persisting,
    Done,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Started, Racing)
                | (Racing, RaceWon)
                | (Racing, RaceLost)
                | (RaceWon, Persisting)
                | (RaceWon, Done)
                | (RaceLost, Done)
                | (Persisting, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Started => "started",
            PipelineState::Racing => "racing",
            PipelineState::RaceWon => "race_won",
            PipelineState::RaceLost => "race_lost",
            PipelineState::Persisting => "persisting",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Persistence failures. Recorded, never returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("store write failed: {0}")]
    Store(TaskError),

    #[error("store write exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),
}

/// What happened to the persistence step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    /// No store configured.
    Skipped,
    Stored,
    Failed(PersistenceError),
}

impl PersistStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PersistStatus::Skipped => "skipped",
            PersistStatus::Stored => "stored",
            PersistStatus::Failed(PersistenceError::Store(_)) => "failed",
            PersistStatus::Failed(PersistenceError::DeadlineExceeded(_)) => "timeout",
        }
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResponse {
    pub quote: Quote,
    /// Name of the winning source.
    pub source: String,
    pub persisted: PersistStatus,
}

/// The only failures that cross the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Race(#[from] RaceError),
}
