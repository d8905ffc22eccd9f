//! Checkpoint-consistent record and byte accounting for one sync attempt.
//!
//! [`MessageTracker`] consumes already-parsed messages from the source and
//! destination connectors and answers three kinds of questions:
//!
//! - how much the source emitted (always exact);
//! - how much the source expects to emit (its own estimates);
//! - how much the destination durably committed, derived by pairing each
//!   destination acknowledgement with the source checkpoint it confirms.
//!
//! Committed counts fail closed: after any internal inconsistency they read
//! as unavailable for the rest of the attempt.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod delta;
pub mod error;
pub mod failure;
pub mod memory;
pub mod registry;
pub mod state_aggregator;
pub mod stats;
pub mod timing;
pub mod tracker;

pub use config::TrackerConfig;
pub use delta::TrackerHealth;
pub use error::TrackerError;
pub use state_aggregator::MergedCheckpoint;
pub use stats::SyncStatsTracker;
pub use tracker::MessageTracker;
