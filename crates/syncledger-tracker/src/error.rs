//! Tracker error types.

use crate::delta::CheckpointIndex;

/// Errors produced while accounting for a sync attempt.
///
/// Only [`TrackerError::InputContractViolation`] ever reaches callers of
/// [`MessageTracker`](crate::MessageTracker); the others are fatal to commit
/// accounting and are absorbed by flipping the tracker to failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// The connector broke a protocol rule the tracker enforces.
    #[error("input contract violation: {0}")]
    InputContractViolation(String),

    /// Accepting a snapshot would exceed the pending-state memory ceiling.
    #[error(
        "checkpoint {index} needs {requested} bytes but only {remaining} of {limit} remain"
    )]
    CapacityExceeded {
        index: CheckpointIndex,
        requested: u64,
        remaining: u64,
        limit: u64,
    },

    /// A commit referenced a checkpoint that was never added.
    #[error("checkpoint {0} was never added")]
    UnknownCheckpoint(CheckpointIndex),

    /// A snapshot was added with an index not above the previous one.
    #[error("checkpoint {index} added after checkpoint {last}")]
    OutOfOrderCheckpoint {
        index: CheckpointIndex,
        last: CheckpointIndex,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_displays_budget() {
        let err = TrackerError::CapacityExceeded {
            index: CheckpointIndex::new(3),
            requested: 40,
            remaining: 12,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "checkpoint 3 needs 40 bytes but only 12 of 100 remain"
        );
    }

    #[test]
    fn unknown_checkpoint_displays_index() {
        let err = TrackerError::UnknownCheckpoint(CheckpointIndex::new(7));
        assert_eq!(err.to_string(), "checkpoint 7 was never added");
    }
}
