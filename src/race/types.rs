//! Outcomes and error definitions shared by tasks and races.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::race::deadline::BudgetError;
use crate::race::source::SourceDescriptor;

/// Why a single fetch or store operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Connection, DNS or I/O failure talking to a remote endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The payload could not be decoded into the expected record.
    #[error("decode error: {0}")]
    Decode(String),

    /// The store rejected or failed the write.
    #[error("storage error: {0}")]
    Storage(String),

    /// The operation observed its cancellation token and gave up.
    #[error("operation cancelled")]
    Cancelled,
}

impl TaskError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Transport(_) => "transport",
            TaskError::Status(_) => "status",
            TaskError::Decode(_) => "decode",
            TaskError::Storage(_) => "storage",
            TaskError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => TaskError::Status(status.as_u16()),
            None => TaskError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        TaskError::Decode(e.to_string())
    }
}

/// The single result reported by a bounded task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Finished before the deadline.
    Success(T),
    /// Finished before the deadline with an error.
    Failure(TaskError),
    /// The deadline elapsed first.
    TimedOut,
}

impl<T> Outcome<T> {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Failure(_) => "failure",
            Outcome::TimedOut => "timeout",
        }
    }
}

/// How a contender lost a race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loss {
    Failed(TaskError),
    TimedOut,
}

impl Loss {
    pub fn kind(&self) -> &'static str {
        match self {
            Loss::Failed(e) => e.kind(),
            Loss::TimedOut => "timeout",
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::Failed(e) => write!(f, "{}", e),
            Loss::TimedOut => write!(f, "deadline exceeded"),
        }
    }
}

/// A recorded loss, kept for observability only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoss {
    pub index: usize,
    pub source: String,
    pub loss: Loss,
}

/// The committed winner of a race.
#[derive(Debug, Clone)]
pub struct RaceWin<T> {
    /// Descriptor of the winning source.
    pub winner: SourceDescriptor<T>,
    /// Position of the winner in the input order.
    pub index: usize,
    /// Decoded value; ownership passes to the caller.
    pub value: T,
    /// Time from launch to commit.
    pub elapsed: Duration,
}

/// Aggregate race failure. Individual task errors never surface on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    /// Every contender lost before the outer deadline.
    #[error("all {} sources failed", losses.len())]
    AllSourcesFailed { losses: Vec<SourceLoss> },

    /// The outer deadline elapsed with no winner.
    #[error("no source answered within {0:?}")]
    DeadlineExceeded(Duration),

    /// Nothing to race.
    #[error("race started with no sources")]
    NoSources,

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

impl RaceError {
    pub fn label(&self) -> &'static str {
        match self {
            RaceError::AllSourcesFailed { .. } => "all_failed",
            RaceError::DeadlineExceeded(_) => "deadline_exceeded",
            RaceError::NoSources => "no_sources",
            RaceError::Budget(_) => "budget",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RaceError::AllSourcesFailed {
            losses: vec![
                SourceLoss {
                    index: 0,
                    source: "a".into(),
                    loss: Loss::Failed(TaskError::Transport("connection refused".into())),
                },
                SourceLoss {
                    index: 1,
                    source: "b".into(),
                    loss: Loss::TimedOut,
                },
            ],
        };
        assert_eq!(err.to_string(), "all 2 sources failed");

        let err = RaceError::DeadlineExceeded(Duration::from_millis(200));
        assert_eq!(err.to_string(), "no source answered within 200ms");
    }

    #[test]
    fn test_labels() {
        assert_eq!(Outcome::<()>::TimedOut.label(), "timeout");
        assert_eq!(Outcome::Success(1).label(), "success");
        assert_eq!(Loss::Failed(TaskError::Status(503)).kind(), "status");
        assert_eq!(Loss::TimedOut.to_string(), "deadline exceeded");
    }
}
