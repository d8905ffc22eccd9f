//! Interfaces of the systems around the tracker.
//!
//! The tracker never calls any of these. They describe what the owning
//! attempt plugs the tracker's outputs into, so adapters can be written and
//! tested against a stable contract.

use syncledger_types::stream::StreamKey;
use syncledger_types::summary::SyncSummary;

use crate::state_aggregator::MergedCheckpoint;

/// Durable storage for merged checkpoint values.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn CheckpointStore>`.
pub trait CheckpointStore: Send + Sync {
    /// Persist the latest merged checkpoint for the attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be stored.
    fn save(&self, state: &MergedCheckpoint) -> anyhow::Result<()>;
}

/// Outcome of a short-lived synchronous job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJobResponse<T> {
    pub succeeded: bool,
    pub output: Option<T>,
    pub logs: Vec<String>,
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub message: Option<String>,
}

/// Client for check, discover, and spec jobs that run outside any sync
/// attempt.
pub trait SyncJobClient: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the job could not be launched.
    fn check_source(
        &self,
        config: &serde_json::Value,
    ) -> anyhow::Result<SyncJobResponse<ConnectionStatus>>;

    /// # Errors
    ///
    /// Returns an error if the job could not be launched.
    fn check_destination(
        &self,
        config: &serde_json::Value,
    ) -> anyhow::Result<SyncJobResponse<ConnectionStatus>>;

    /// # Errors
    ///
    /// Returns an error if the job could not be launched.
    fn discover(
        &self,
        config: &serde_json::Value,
    ) -> anyhow::Result<SyncJobResponse<Vec<StreamKey>>>;

    /// Fetch the connector specification published by `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job could not be launched.
    fn spec(&self, image: &str) -> anyhow::Result<SyncJobResponse<serde_json::Value>>;
}

/// Decides whether an attempt made progress worth keeping.
pub trait ProgressPredicate: Send + Sync {
    fn made_progress(&self, summary: &SyncSummary) -> bool;
}

/// Progress means at least one record is known to be committed.
///
/// Unknown committed counts do not count as progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommittedRecordsProgress;

impl ProgressPredicate for CommittedRecordsProgress {
    fn made_progress(&self, summary: &SyncSummary) -> bool {
        summary.records_committed.is_some_and(|n| n > 0)
    }
}
