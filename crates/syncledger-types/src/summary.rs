//! Attempt summaries handed to reporting collaborators.
//!
//! Committed counts are `Option`s: `None` means the tracker cannot vouch
//! for them (commit tracking disabled or failed), which is reported as
//! "unknown" and is never the same thing as zero.

use crate::stream::StreamKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-stream counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub stream: StreamKey,
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_estimated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_estimated: Option<u64>,
    pub records_committed: Option<u64>,
    pub bytes_committed: Option<u64>,
}

/// Checkpoint latency metrics, in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointTiming {
    /// Longest gap between consecutive source checkpoints.
    pub max_seconds_between_source_checkpoints: Option<u64>,
    pub mean_seconds_between_source_checkpoints: Option<u64>,
    /// Longest delay between a source checkpoint and its acknowledgement.
    pub max_seconds_to_commit: Option<u64>,
    pub mean_seconds_to_commit: Option<u64>,
}

/// Everything the tracker knows about one attempt, read atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    pub records_estimated: u64,
    pub bytes_estimated: u64,
    pub records_committed: Option<u64>,
    pub bytes_committed: Option<u64>,
    pub source_checkpoints_emitted: u64,
    pub destination_checkpoints_received: u64,
    /// Largest single pending checkpoint snapshot, in approximate bytes.
    pub max_snapshot_bytes: u64,
    /// Approximate bytes held by not-yet-acknowledged snapshots.
    pub pending_state_bytes: u64,
    pub checkpoint_timing: CheckpointTiming,
    /// Streams in first-observation order.
    pub streams: Vec<StreamSummary>,
}

struct Known(Option<u64>);

impl fmt::Display for Known {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("unknown"),
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records emitted: {}", self.records_emitted)?;
        writeln!(f, "bytes emitted: {}", self.bytes_emitted)?;
        writeln!(f, "records estimated: {}", self.records_estimated)?;
        writeln!(f, "records committed: {}", Known(self.records_committed))?;
        writeln!(f, "bytes committed: {}", Known(self.bytes_committed))?;
        writeln!(
            f,
            "checkpoints: {} emitted, {} acknowledged",
            self.source_checkpoints_emitted, self.destination_checkpoints_received
        )?;
        for s in &self.streams {
            writeln!(
                f,
                "  {}: emitted {}, committed {}",
                s.stream,
                s.records_emitted,
                Known(s.records_committed)
            )?;
        }
        Ok(())
    }
}
