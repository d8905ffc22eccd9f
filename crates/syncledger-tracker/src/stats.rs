//! Read model over emitted, estimated, and committed counters.
//!
//! [`SyncStatsTracker`] is a borrowed view taken under the tracker lock.
//! It never mutates anything and never fails; committed figures come back
//! as `None` when they cannot be trusted.

use std::collections::HashMap;

use syncledger_types::estimate::EstimateMessage;
use syncledger_types::stream::StreamKey;
use syncledger_types::summary::{CheckpointTiming, StreamSummary, SyncSummary};

use crate::delta::StatsCounters;
use crate::error::{Result, TrackerError};
use crate::memory::MemoryGuard;
use crate::registry::{StreamIndex, StreamRegistry};

/// Records and bytes emitted by the source, overall and per stream.
#[derive(Debug, Default)]
pub struct EmittedCounters {
    per_stream: Vec<StatsCounters>,
    total: StatsCounters,
}

impl EmittedCounters {
    pub fn record(&mut self, stream: StreamIndex, bytes: u64) {
        let slot = stream.as_usize();
        if self.per_stream.len() <= slot {
            self.per_stream.resize(slot + 1, StatsCounters::default());
        }
        self.per_stream[slot].add_record(bytes);
        self.total.add_record(bytes);
    }

    #[must_use]
    pub fn total(&self) -> StatsCounters {
        self.total
    }

    #[must_use]
    pub fn stream(&self, stream: StreamIndex) -> StatsCounters {
        self.per_stream
            .get(stream.as_usize())
            .copied()
            .unwrap_or_default()
    }
}

/// Estimated `(bytes, records)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Estimate {
    pub bytes: u64,
    pub records: u64,
}

/// Source estimates. The first estimate message fixes the shape.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum EstimateState {
    #[default]
    Unset,
    PerStream(HashMap<StreamKey, Estimate>),
    Sync(Estimate),
}

impl EstimateState {
    /// Apply an estimate. A newer estimate for the same scope replaces the
    /// older one.
    ///
    /// # Errors
    ///
    /// [`TrackerError::InputContractViolation`] if the message's shape
    /// differs from the one already fixed. State is left untouched.
    pub fn apply(&mut self, msg: &EstimateMessage) -> Result<()> {
        let (bytes, records) = msg.counts();
        let estimate = Estimate { bytes, records };
        match msg {
            EstimateMessage::Stream { stream, .. } => match self {
                Self::Unset => {
                    *self = Self::PerStream(HashMap::from([(stream.clone(), estimate)]));
                }
                Self::PerStream(map) => {
                    map.insert(stream.clone(), estimate);
                }
                Self::Sync(_) => {
                    return Err(TrackerError::InputContractViolation(format!(
                        "per-stream estimate for {stream} received after a sync-wide estimate"
                    )));
                }
            },
            EstimateMessage::Sync { .. } => match self {
                Self::Unset | Self::Sync(_) => *self = Self::Sync(estimate),
                Self::PerStream(_) => {
                    return Err(TrackerError::InputContractViolation(
                        "sync-wide estimate received after per-stream estimates".into(),
                    ));
                }
            },
        }
        Ok(())
    }

    #[must_use]
    pub fn total(&self) -> Estimate {
        match self {
            Self::Unset => Estimate::default(),
            Self::Sync(estimate) => *estimate,
            Self::PerStream(map) => map.values().fold(Estimate::default(), |acc, e| Estimate {
                bytes: acc.bytes.saturating_add(e.bytes),
                records: acc.records.saturating_add(e.records),
            }),
        }
    }

    #[must_use]
    pub fn stream(&self, key: &StreamKey) -> Option<Estimate> {
        match self {
            Self::PerStream(map) => map.get(key).copied(),
            Self::Unset | Self::Sync(_) => None,
        }
    }
}

/// Checkpoint traffic counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointCounts {
    pub source_emitted: u64,
    pub destination_received: u64,
}

/// Query surface over one consistent moment of a tracker.
pub struct SyncStatsTracker<'a> {
    pub(crate) registry: &'a StreamRegistry,
    pub(crate) emitted: &'a EmittedCounters,
    pub(crate) estimates: &'a EstimateState,
    pub(crate) committed: Option<&'a [StatsCounters]>,
    pub(crate) memory: Option<&'a MemoryGuard>,
    pub(crate) checkpoints: CheckpointCounts,
    pub(crate) timing: CheckpointTiming,
}

impl SyncStatsTracker<'_> {
    #[must_use]
    pub fn total_records_emitted(&self) -> u64 {
        self.emitted.total().records
    }

    #[must_use]
    pub fn total_bytes_emitted(&self) -> u64 {
        self.emitted.total().bytes
    }

    #[must_use]
    pub fn stream_to_emitted_records(&self) -> HashMap<StreamKey, u64> {
        self.per_stream(|i| self.emitted.stream(i).records)
    }

    #[must_use]
    pub fn stream_to_emitted_bytes(&self) -> HashMap<StreamKey, u64> {
        self.per_stream(|i| self.emitted.stream(i).bytes)
    }

    #[must_use]
    pub fn total_records_estimated(&self) -> u64 {
        self.estimates.total().records
    }

    #[must_use]
    pub fn total_bytes_estimated(&self) -> u64 {
        self.estimates.total().bytes
    }

    /// Per-stream record estimates; empty when the source estimates sync-wide.
    #[must_use]
    pub fn stream_to_estimated_records(&self) -> HashMap<StreamKey, u64> {
        match self.estimates {
            EstimateState::PerStream(map) => {
                map.iter().map(|(k, e)| (k.clone(), e.records)).collect()
            }
            EstimateState::Unset | EstimateState::Sync(_) => HashMap::new(),
        }
    }

    #[must_use]
    pub fn stream_to_estimated_bytes(&self) -> HashMap<StreamKey, u64> {
        match self.estimates {
            EstimateState::PerStream(map) => {
                map.iter().map(|(k, e)| (k.clone(), e.bytes)).collect()
            }
            EstimateState::Unset | EstimateState::Sync(_) => HashMap::new(),
        }
    }

    /// `None` when committed counts are unavailable.
    #[must_use]
    pub fn total_records_committed(&self) -> Option<u64> {
        self.committed
            .map(|c| c.iter().fold(0u64, |acc, s| acc.saturating_add(s.records)))
    }

    #[must_use]
    pub fn total_bytes_committed(&self) -> Option<u64> {
        self.committed
            .map(|c| c.iter().fold(0u64, |acc, s| acc.saturating_add(s.bytes)))
    }

    /// Committed records for every stream observed so far, including
    /// streams with nothing committed yet.
    #[must_use]
    pub fn stream_to_committed_records(&self) -> Option<HashMap<StreamKey, u64>> {
        let committed = self.committed?;
        Some(self.per_stream(|i| committed_at(committed, i).records))
    }

    #[must_use]
    pub fn stream_to_committed_bytes(&self) -> Option<HashMap<StreamKey, u64>> {
        let committed = self.committed?;
        Some(self.per_stream(|i| committed_at(committed, i).bytes))
    }

    #[must_use]
    pub fn source_checkpoints_emitted(&self) -> u64 {
        self.checkpoints.source_emitted
    }

    #[must_use]
    pub fn destination_checkpoints_received(&self) -> u64 {
        self.checkpoints.destination_received
    }

    #[must_use]
    pub fn checkpoint_timing(&self) -> CheckpointTiming {
        self.timing
    }

    /// Largest single snapshot seen; zero when commit tracking is disabled.
    #[must_use]
    pub fn max_snapshot_bytes(&self) -> u64 {
        self.memory.map_or(0, MemoryGuard::max_snapshot_bytes)
    }

    #[must_use]
    pub fn pending_state_bytes(&self) -> u64 {
        self.memory.map_or(0, MemoryGuard::used)
    }

    /// Everything above, bundled for reporting.
    #[must_use]
    pub fn summary(&self) -> SyncSummary {
        let streams = self
            .registry
            .keys()
            .map(|(index, key)| {
                let emitted = self.emitted.stream(index);
                let estimate = self.estimates.stream(key);
                let committed = self.committed.map(|c| committed_at(c, index));
                StreamSummary {
                    stream: key.clone(),
                    records_emitted: emitted.records,
                    bytes_emitted: emitted.bytes,
                    records_estimated: estimate.map(|e| e.records),
                    bytes_estimated: estimate.map(|e| e.bytes),
                    records_committed: committed.map(|c| c.records),
                    bytes_committed: committed.map(|c| c.bytes),
                }
            })
            .collect();

        SyncSummary {
            records_emitted: self.total_records_emitted(),
            bytes_emitted: self.total_bytes_emitted(),
            records_estimated: self.total_records_estimated(),
            bytes_estimated: self.total_bytes_estimated(),
            records_committed: self.total_records_committed(),
            bytes_committed: self.total_bytes_committed(),
            source_checkpoints_emitted: self.checkpoints.source_emitted,
            destination_checkpoints_received: self.checkpoints.destination_received,
            max_snapshot_bytes: self.max_snapshot_bytes(),
            pending_state_bytes: self.pending_state_bytes(),
            checkpoint_timing: self.timing,
            streams,
        }
    }

    fn per_stream(&self, value: impl Fn(StreamIndex) -> u64) -> HashMap<StreamKey, u64> {
        self.registry
            .keys()
            .map(|(index, key)| (key.clone(), value(index)))
            .collect()
    }
}

fn committed_at(committed: &[StatsCounters], index: StreamIndex) -> StatsCounters {
    committed.get(index.as_usize()).copied().unwrap_or_default()
}
